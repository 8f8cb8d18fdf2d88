//! Navigational links on response envelopes.
//!
//! Every entity representation carries a `_links` object pointing at the
//! record itself and at its collection; collection responses carry their
//! own link. Link construction is purely syntactic — handlers pass the
//! collection path and the record id.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A single hyperlink.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Link {
    pub href: String,
}

/// Links attached to a single entity representation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EntityLinks {
    #[serde(rename = "self")]
    pub self_link: Link,
    pub collection: Link,
}

/// An entity view wrapped with its navigational links.
#[derive(Debug, Serialize, Deserialize)]
pub struct Linked<T> {
    #[serde(flatten)]
    pub item: T,
    #[serde(rename = "_links")]
    pub links: EntityLinks,
}

/// A collection page wrapped with its own link.
#[derive(Debug, Serialize, Deserialize)]
pub struct Collection<T> {
    pub items: Vec<Linked<T>>,
    #[serde(rename = "_links")]
    pub links: CollectionLinks,
}

/// Links attached to a collection response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CollectionLinks {
    #[serde(rename = "self")]
    pub self_link: Link,
}

/// Wrap one entity view with self/collection links.
pub fn linked<T>(item: T, collection: &str, id: Uuid) -> Linked<T> {
    Linked {
        item,
        links: EntityLinks {
            self_link: Link {
                href: format!("/{collection}/{id}"),
            },
            collection: Link {
                href: format!("/{collection}"),
            },
        },
    }
}

/// Wrap a page of `(id, view)` pairs into a collection envelope.
pub fn collection<T>(items: Vec<(Uuid, T)>, collection_path: &str) -> Collection<T> {
    Collection {
        items: items
            .into_iter()
            .map(|(id, item)| linked(item, collection_path, id))
            .collect(),
        links: CollectionLinks {
            self_link: Link {
                href: format!("/{collection_path}"),
            },
        },
    }
}
