use super::entity::{EntityRef, EntitySource};

/// Entity references represented by `source`, in discovery order.
///
/// Never fails: a shape that carries no identity yields nothing, and so does
/// an entity without a primary key. Duplicates are kept; the record builder
/// collapses them.
pub fn extract(source: &EntitySource) -> Vec<EntityRef> {
    let mut out = Vec::new();
    extract_into(source, &mut out);
    out
}

/// [`extract`] over every declared source, concatenated in order.
pub fn extract_all(sources: &[EntitySource]) -> Vec<EntityRef> {
    let mut out = Vec::new();
    for source in sources {
        extract_into(source, &mut out);
    }
    out
}

fn extract_into(source: &EntitySource, out: &mut Vec<EntityRef>) {
    match source {
        EntitySource::Single(snapshot) => match snapshot.primary_key.as_deref() {
            Some(pk) if !pk.is_empty() => {
                out.push(EntityRef::new(&snapshot.entity_type, pk));
            }
            _ => {
                tracing::debug!(
                    entity_type = %snapshot.entity_type,
                    "entity without primary key, skipped"
                );
            }
        },
        EntitySource::Collection(items) => {
            for item in items {
                extract_into(item, out);
            }
        }
        EntitySource::Paginated(page) => {
            for item in &page.items {
                extract_into(item, out);
            }
        }
        EntitySource::Opaque => {}
    }
}
