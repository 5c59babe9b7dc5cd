use {
    serde::{Deserialize, Serialize},
    std::{
        collections::{BTreeSet, HashSet},
        fmt,
    },
};

/// A value traceable to a persisted record.
///
/// `ENTITY_TYPE` is the schema name written into audit records; the key is
/// whatever the storage layer uses as identity. Returning `None` means the
/// instance has no usable identity yet (unsaved rows, projections) and it is
/// left out of the audit trail.
pub trait Entity {
    const ENTITY_TYPE: &'static str;

    fn primary_key(&self) -> Option<String>;
}

/// One disclosed record: schema name plus primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub primary_key: String,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            primary_key: primary_key.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.primary_key)
    }
}

/// Identity of a single entity captured when the response is built, so the
/// source can outlive the borrowed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySnapshot {
    pub entity_type: String,
    pub primary_key: Option<String>,
}

impl EntitySnapshot {
    pub fn of<E: Entity>(entity: &E) -> Self {
        Self {
            entity_type: E::ENTITY_TYPE.to_string(),
            primary_key: entity.primary_key(),
        }
    }
}

/// Page of a paginated listing, as seen by the audit pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSource {
    pub number: u32,
    pub items: Vec<EntitySource>,
}

/// Shape of an entity-query result that contributed to a response body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EntitySource {
    Single(EntitySnapshot),
    Collection(Vec<EntitySource>),
    Paginated(PageSource),
    /// Plain data with no entity identity behind it.
    #[default]
    Opaque,
}

impl EntitySource {
    pub fn single<E: Entity>(entity: &E) -> Self {
        Self::Single(EntitySnapshot::of(entity))
    }

    pub fn collection<'a, E, I>(items: I) -> Self
    where
        E: Entity + 'a,
        I: IntoIterator<Item = &'a E>,
    {
        Self::Collection(items.into_iter().map(Self::single).collect())
    }
}

/// Conversion of handler-side values into an [`EntitySource`].
pub trait ToEntitySource {
    fn to_entity_source(&self) -> EntitySource;
}

impl<E: Entity> ToEntitySource for E {
    fn to_entity_source(&self) -> EntitySource {
        EntitySource::single(self)
    }
}

impl<E: Entity> ToEntitySource for [E] {
    fn to_entity_source(&self) -> EntitySource {
        EntitySource::collection(self)
    }
}

impl<E: Entity> ToEntitySource for Vec<E> {
    fn to_entity_source(&self) -> EntitySource {
        EntitySource::collection(self)
    }
}

/// Iteration order is the set's own; hash sets give no stable order.
impl<E: Entity, H> ToEntitySource for HashSet<E, H> {
    fn to_entity_source(&self) -> EntitySource {
        EntitySource::collection(self)
    }
}

impl<E: Entity> ToEntitySource for BTreeSet<E> {
    fn to_entity_source(&self) -> EntitySource {
        EntitySource::collection(self)
    }
}

impl<E: Entity> ToEntitySource for Option<E> {
    fn to_entity_source(&self) -> EntitySource {
        match self {
            Some(entity) => EntitySource::single(entity),
            None => EntitySource::Opaque,
        }
    }
}

impl<E: Entity> ToEntitySource for Page<E> {
    fn to_entity_source(&self) -> EntitySource {
        EntitySource::Paginated(PageSource {
            number: self.page,
            items: self.items.iter().map(EntitySource::single).collect(),
        })
    }
}

impl ToEntitySource for EntitySource {
    fn to_entity_source(&self) -> EntitySource {
        self.clone()
    }
}

/// Already-serialized JSON has lost its identity.
impl ToEntitySource for serde_json::Value {
    fn to_entity_source(&self) -> EntitySource {
        EntitySource::Opaque
    }
}

/// One page of a listing, serialized as `{page, per_page, total, items}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub items: Vec<T>,
}

impl<T: Clone> Page<T> {
    /// Slice `all` into 1-based page `page`. Out-of-range pages are empty.
    pub fn paginate(all: &[T], page: u32, per_page: u32) -> Self {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let start = (page as usize - 1).saturating_mul(per_page as usize);
        let items = all
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect();

        Self {
            page,
            per_page,
            total: all.len() as u64,
            items,
        }
    }
}
