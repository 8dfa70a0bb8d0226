//! Demo resource exercising groups, path parameters and error handlers.

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::Response;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::docs::{DocGroup, DocItem, DocPayload};
use crate::http::handler::{error_handler, from_fn, ErrorHandler};
use crate::http::outcome::Outcome;
use crate::http::request::Exchange;
use crate::routing::{RouteOptions, Router};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Widget {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<Widget>,
}

crate::describe_struct!(Widget {
    id: String,
    name: String,
    tags: Vec<String>,
    #[description = "Sub-assemblies"]
    parts: Vec<Widget>,
});

/// Body of a rejected widget request.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetError {
    pub status: u16,
    pub message: String,
}

crate::describe_struct!(WidgetError {
    status: u16,
    message: String,
});

#[derive(Debug, Default)]
pub struct WidgetStore {
    widgets: DashMap<String, Widget>,
}

impl WidgetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, widget: Widget) -> bool {
        if self.widgets.contains_key(&widget.id) {
            return false;
        }
        self.widgets.insert(widget.id.clone(), widget);
        true
    }

    pub fn get(&self, id: &str) -> Option<Widget> {
        self.widgets.get(id).map(|w| w.clone())
    }

    pub fn remove(&self, id: &str) -> Option<Widget> {
        self.widgets.remove(id).map(|(_, w)| w)
    }

    /// All widgets ordered by id.
    pub fn list(&self) -> Vec<Widget> {
        let mut all: Vec<Widget> = self.widgets.iter().map(|w| w.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}

/// Renders handler rejections as a JSON [`WidgetError`].
pub fn json_errors() -> ErrorHandler {
    error_handler(|_ex: &mut Exchange, outcome: Outcome| {
        let status = outcome.status();
        let body = WidgetError {
            status: status.as_u16(),
            message: outcome.cause().map(|c| c.message()).unwrap_or_default(),
        };
        let mut response = Response::new(serde_json::to_vec(&body).unwrap_or_default().into());
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    })
}

pub fn register(router: &mut Router, store: Arc<WidgetStore>) {
    let options = |doc: DocPayload| RouteOptions::new().error_handler(json_errors()).doc(doc);

    router.group_document(
        from_fn(|ex: &mut Exchange| match ex.request.param("id") {
            Some(id) if !id.starts_with('w') => Outcome::reject(StatusCode::NOT_FOUND),
            _ => Outcome::empty(),
        }),
        DocGroup::new().response(404, DocItem::described("Unknown widget")),
        &["widgets"],
    );

    let list = {
        let store = store.clone();
        from_fn(move |_ex: &mut Exchange| Outcome::ok(&store.list()))
    };
    let find = {
        let store = store.clone();
        from_fn(move |ex: &mut Exchange| {
            let id = ex.request.param("id").unwrap_or_default();
            match store.get(id) {
                Some(widget) => Outcome::ok(&widget),
                None => Outcome::reject(StatusCode::NOT_FOUND),
            }
        })
    };
    let create = {
        let store = store.clone();
        from_fn(move |ex: &mut Exchange| {
            let widget: Widget = match ex.request.json() {
                Ok(widget) => widget,
                Err(e) => return Outcome::err(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            };
            if !widget.id.starts_with('w') {
                return Outcome::err(StatusCode::UNPROCESSABLE_ENTITY, "widget ids start with 'w'");
            }
            if !store.insert(widget.clone()) {
                return Outcome::err(StatusCode::CONFLICT, format!("widget {} already exists", widget.id));
            }
            Outcome::ok(&widget)
        })
    };
    let delete = from_fn(move |ex: &mut Exchange| {
        let id = ex.request.param("id").unwrap_or_default();
        match store.remove(id) {
            Some(widget) => Outcome::ok(&widget),
            None => Outcome::reject(StatusCode::NOT_FOUND),
        }
    });

    router
        .route_options(
            Method::GET,
            "widgets",
            list,
            options(
                DocPayload::new()
                    .description("All widgets")
                    .response(200, DocItem::of::<Vec<Widget>>("Widgets ordered by id")),
            ),
        )
        .route_options(
            Method::GET,
            "widgets/{id}",
            find,
            options(
                DocPayload::new()
                    .description("One widget")
                    .parameter("id", "Widget id, starts with 'w'")
                    .response(200, DocItem::of::<Widget>("The widget")),
            ),
        )
        .route_options(
            Method::POST,
            "widgets",
            create,
            options(
                DocPayload::new()
                    .description("Create a widget")
                    .request(DocItem::of::<Widget>("New widget"))
                    .response(200, DocItem::of::<Widget>("Created widget"))
                    .response(409, DocItem::of::<WidgetError>("Id already taken"))
                    .response(422, DocItem::of::<WidgetError>("Malformed widget")),
            ),
        )
        .route_options(
            Method::DELETE,
            "widgets/{id}",
            delete,
            options(
                DocPayload::new()
                    .description("Delete a widget")
                    .parameter("id", "Widget id")
                    .response(200, DocItem::of::<Widget>("Deleted widget")),
            ),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::factory::conformance::{assert_documents, documented_fields};
    use std::collections::BTreeSet;

    fn widget(id: &str) -> Widget {
        Widget {
            id: id.into(),
            name: format!("Widget {}", id),
            tags: Vec::new(),
            parts: Vec::new(),
        }
    }

    #[test]
    fn store_rejects_duplicates_and_sorts() {
        let store = WidgetStore::new();
        assert!(store.insert(widget("w2")));
        assert!(store.insert(widget("w1")));
        assert!(!store.insert(widget("w1")));

        let ids: Vec<_> = store.list().into_iter().map(|w| w.id).collect();
        assert_eq!(ids, vec!["w1", "w2"]);
        assert_eq!(store.remove("w1").map(|w| w.id), Some("w1".to_string()));
        assert!(store.get("w1").is_none());
    }

    #[test]
    fn schemas_match_serialized_shape() {
        let full = Widget {
            tags: vec!["metal".into()],
            parts: vec![widget("w1a")],
            ..widget("w1")
        };
        assert_documents(&full);

        let (_, required) = documented_fields::<Widget>();
        let minimal = serde_json::to_value(widget("w1")).unwrap();
        let present: BTreeSet<String> = minimal.as_object().unwrap().keys().cloned().collect();
        assert_eq!(required, present);

        assert_documents(&WidgetError {
            status: 404,
            message: "missing".into(),
        });
    }

    #[test]
    fn empty_collections_are_omitted() {
        let json = serde_json::to_value(widget("w1")).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "w1", "name": "Widget w1" }));
    }
}
