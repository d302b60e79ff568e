use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;

use smartapi::config::Config;
use smartapi::logging;
use smartapi::middleware::AccessLogMiddleware;
use smartapi::{
    as_int, json_body, query_param, request_struct, required_header, response_status, url_param,
    ApiError, Field, Json, RequestStruct, Routes, Server, TracingLogger,
};

#[derive(Clone, Debug, Serialize)]
struct User {
    id: i64,
    name: String,
    email: String,
}

#[derive(Clone, Debug, Serialize)]
struct Order {
    id: i64,
    user_id: i64,
    item: String,
}

#[derive(Debug, Default, Deserialize)]
struct NewUser {
    name: String,
    email: String,
}

/// Query of the user listing endpoint.
#[derive(Default)]
struct ListUsers {
    prefix: String,
    limit: i64,
}

impl RequestStruct for ListUsers {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::new("prefix", "query_param=prefix", |s: &mut Self, v| s.prefix = v),
            Field::new("limit", "as_int=query_param=limit", |s: &mut Self, v| s.limit = v),
        ]
    }
}

#[derive(Default)]
struct UserStore {
    next_id: AtomicI64,
    users: Mutex<HashMap<i64, User>>,
}

impl UserStore {
    fn get(&self, id: i64) -> Result<User, ApiError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        users.get(&id).cloned().ok_or_else(|| {
            ApiError::new(StatusCode::NOT_FOUND, format!("user {id} not found"), "user not found")
        })
    }

    fn create(&self, new: NewUser) -> Result<User, ApiError> {
        if new.name.is_empty() {
            return Err(ApiError::bad_request("name is required"));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let user = User {
            id,
            name: new.name,
            email: new.email,
        };
        let mut users = self.users.lock().map_err(|_| poisoned())?;
        users.insert(id, user.clone());
        Ok(user)
    }

    /// Orders are derived from the user so the demo needs no second table.
    fn order(&self, user_id: i64, order_id: i64) -> Result<Order, ApiError> {
        let user = self.get(user_id)?;
        if !(1..=3).contains(&order_id) {
            return Err(ApiError::new(
                StatusCode::NOT_FOUND,
                format!("order {order_id} of user {user_id} not found"),
                "order not found",
            ));
        }
        Ok(Order {
            id: order_id,
            user_id: user.id,
            item: format!("{}'s item #{order_id}", user.name),
        })
    }

    fn list(&self, query: &ListUsers) -> Result<Vec<User>, ApiError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        let mut found: Vec<User> = users
            .values()
            .filter(|u| u.name.starts_with(&query.prefix))
            .cloned()
            .collect();
        found.sort_by_key(|u| u.id);
        if query.limit > 0 {
            found.truncate(query.limit as usize);
        }
        Ok(found)
    }
}

fn poisoned() -> ApiError {
    ApiError::from_message(StatusCode::INTERNAL_SERVER_ERROR, "user store lock poisoned")
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;
    logging::init(&config.logging)?;

    info!("Starting smartapi {}", smartapi::VERSION);
    config.log_summary();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let store = Arc::new(UserStore::default());

    let mut server = Server::new()
        .with_config(config.server.clone())
        .with_logger(Arc::new(TracingLogger));
    server.use_middleware(AccessLogMiddleware::with_enabled(config.middleware.access_log));

    server.get(
        "/hello",
        |name: String| -> Result<String, ApiError> {
            if name.is_empty() {
                return Ok("hello, world\n".to_string());
            }
            Ok(format!("hello, {name}\n"))
        },
        [query_param("name")],
    );

    let users = Arc::clone(&store);
    let by_id = Arc::clone(&store);
    let creator = Arc::clone(&store);
    let orders = Arc::clone(&store);
    server.route(
        "/v1",
        move |v1| {
            v1.get(
                "/users",
                move |_token: String, query: Box<ListUsers>| -> Result<Json<Vec<User>>, ApiError> {
                    users.list(&query).map(Json)
                },
                [request_struct::<ListUsers>()],
            )
            .get(
                "/users/{id}",
                move |_token: String, id: i64| -> Result<Json<User>, ApiError> {
                    by_id.get(id).map(Json)
                },
                [as_int(url_param("id"))],
            )
            .post(
                "/users",
                move |_token: String, new: Box<NewUser>| -> Result<Json<User>, ApiError> {
                    creator.create(*new).map(Json)
                },
                [json_body::<NewUser>(), response_status(StatusCode::CREATED)],
            )
            .get(
                "/users/{id}/orders/{order}",
                move |_token: String, id: i64, order: i64| -> Result<Json<Order>, ApiError> {
                    orders.order(id, order).map(Json)
                },
                [as_int(url_param("id")), as_int(url_param("order"))],
            );
        },
        [required_header("X-Token")],
    );

    server.run().await?;
    info!("Server stopped");
    Ok(())
}
