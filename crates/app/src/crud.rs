//! CRUD route generation for a [`Module`].

use std::sync::Arc;

use serde_json::Value;
use tendril_domain::record::Record;

use crate::module::Module;
use crate::route::{Method, RouteDescriptor, RouteResponse, handler};
use crate::schema::{SchemaKind, SchemaProvider};

/// Generates the five CRUD routes of a module.
pub struct RouteGenerator;

impl RouteGenerator {
    /// Routes for module `X`, in order:
    /// `GET /X`, `GET /X/{id}`, `POST /X`, `PUT /X/{id}`, `DELETE /X/{id}`.
    ///
    /// Every success answers `200` with the record(s) as body.
    pub fn generate<T: Record>(module: &Arc<Module<T>>) -> Vec<RouteDescriptor> {
        let name = module.name().to_string();
        let collection = format!("/{name}");
        let item = format!("/{name}/{{id}}");
        let schema = module.schema();
        let create_body = schema.document(SchemaKind::Create).cloned();
        let update_body = schema
            .document(SchemaKind::Update)
            .or_else(|| schema.document(SchemaKind::Create))
            .cloned();

        vec![
            RouteDescriptor::new(Method::Get, collection.clone(), {
                let module = Arc::clone(module);
                handler(move |req| {
                    let module = Arc::clone(&module);
                    async move {
                        let filter = module.schema().coerce_query(&req.query);
                        let records = module.find_many(filter).await?;
                        RouteResponse::json(&records)
                    }
                })
            })
            .summary(format!("List {name}"))
            .description(format!("List {name}, filtered by field equality"))
            .query_schema(schema.document(SchemaKind::Query).cloned()),
            RouteDescriptor::new(Method::Get, item.clone(), {
                let module = Arc::clone(module);
                handler(move |req| {
                    let module = Arc::clone(&module);
                    async move {
                        let record = module.find_one(req.param("id")?).await?;
                        RouteResponse::json(&record)
                    }
                })
            })
            .summary(format!("Get one of {name} by id"))
            .description(format!("Fetch a single record of {name}")),
            RouteDescriptor::new(Method::Post, collection, {
                let module = Arc::clone(module);
                handler(move |req| {
                    let module = Arc::clone(&module);
                    async move {
                        let record = module.create(req.body).await?;
                        RouteResponse::json(&record)
                    }
                })
            })
            .summary(format!("Create one of {name}"))
            .description(format!("Validate and persist a new record of {name}"))
            .body_schema(create_body),
            RouteDescriptor::new(Method::Put, item.clone(), {
                let module = Arc::clone(module);
                handler(move |req| {
                    let module = Arc::clone(&module);
                    async move {
                        let id = req.param("id")?.to_string();
                        let record = module.update(&id, req.body).await?;
                        RouteResponse::json(&record)
                    }
                })
            })
            .summary(format!("Update one of {name}"))
            .description(format!("Merge the body into an existing record of {name}"))
            .body_schema(update_body),
            RouteDescriptor::new(Method::Delete, item, {
                let module = Arc::clone(module);
                handler(move |req| {
                    let module = Arc::clone(&module);
                    async move {
                        let record = module.delete(req.param("id")?).await?;
                        RouteResponse::json(&record)
                    }
                })
            })
            .summary(format!("Delete one of {name}"))
            .description(format!("Remove a record of {name}")),
        ]
    }
}

/// Body of a request as an array of items, for batch routes.
pub(crate) fn body_items(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteRequest;
    use crate::testing::widget_module;
    use serde_json::json;
    use std::collections::HashMap;

    fn find<'a>(routes: &'a [RouteDescriptor], method: Method, path: &str) -> &'a RouteDescriptor {
        routes
            .iter()
            .find(|r| r.method == method && r.path == path)
            .unwrap()
    }

    fn with_id(id: &str, body: Value) -> RouteRequest {
        RouteRequest {
            params: HashMap::from([("id".to_string(), id.to_string())]),
            body,
            ..RouteRequest::default()
        }
    }

    #[test]
    fn should_generate_exactly_five_routes() {
        let (module, _) = widget_module();
        let routes = RouteGenerator::generate(&module);
        let shape: Vec<(Method, &str)> = routes
            .iter()
            .map(|r| (r.method, r.path.as_str()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (Method::Get, "/widgets"),
                (Method::Get, "/widgets/{id}"),
                (Method::Post, "/widgets"),
                (Method::Put, "/widgets/{id}"),
                (Method::Delete, "/widgets/{id}"),
            ]
        );
    }

    #[test]
    fn should_declare_create_schema_as_post_body() {
        let (module, _) = widget_module();
        let routes = RouteGenerator::generate(&module);
        let post = find(&routes, Method::Post, "/widgets");
        assert_eq!(
            post.input_schemas.body.as_ref(),
            module.schema().document(SchemaKind::Create)
        );
        let put = find(&routes, Method::Put, "/widgets/{id}");
        assert!(put.input_schemas.body.as_ref().unwrap().get("required").is_none());
    }

    #[tokio::test]
    async fn should_serve_crud_through_handlers() {
        let (module, _) = widget_module();
        let routes = RouteGenerator::generate(&module);

        let created = find(&routes, Method::Post, "/widgets")
            .call(RouteRequest {
                body: json!({"name": "a"}),
                ..RouteRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(created.status, 200);
        let id = created.body["id"].as_str().unwrap().to_string();

        let updated = find(&routes, Method::Put, "/widgets/{id}")
            .call(with_id(&id, json!({"name": "b"})))
            .await
            .unwrap();
        assert_eq!(updated.body["name"], "b");

        let mut list_request = RouteRequest::default();
        list_request.query.insert("name".to_string(), json!("b"));
        let listed = find(&routes, Method::Get, "/widgets")
            .call(list_request)
            .await
            .unwrap();
        assert_eq!(listed.body.as_array().unwrap().len(), 1);

        find(&routes, Method::Delete, "/widgets/{id}")
            .call(with_id(&id, Value::Null))
            .await
            .unwrap();
        let err = find(&routes, Method::Get, "/widgets/{id}")
            .call(with_id(&id, Value::Null))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "widgets.not_found");
    }

    #[test]
    fn should_treat_single_body_as_one_item() {
        assert_eq!(body_items(json!({"a": 1})).len(), 1);
        assert_eq!(body_items(json!([1, 2])).len(), 2);
    }
}
