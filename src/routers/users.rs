//! The `users` route group.

use std::sync::Arc;

use tracing::info;

use crate::error::HandlerError;
use crate::gateway::{handler_fn, Access, Handler, HandlerResponse, RequestContext, RouteGroup};
use crate::store::{NewUser, ProvenanceStore};

use super::RouterState;

pub fn group(state: &RouterState) -> RouteGroup {
    let store = &state.store;

    // "/me" must stay ahead of "/{id}"
    RouteGroup::new("users", "/users")
        .get("", Access::Public, list_users(Arc::clone(store)))
        .get("/me", Access::Authenticated, current_user(Arc::clone(store)))
        .get("/{id}", Access::Public, user_by_id(Arc::clone(store)))
        .post("", Access::Authenticated, create_user(Arc::clone(store)))
}

fn list_users(store: Arc<dyn ProvenanceStore>) -> Arc<dyn Handler> {
    handler_fn(move |_ctx: RequestContext| {
        let store = Arc::clone(&store);
        async move {
            let users = store.list_users().await?;
            HandlerResponse::ok(&users)
        }
    })
}

fn current_user(store: Arc<dyn ProvenanceStore>) -> Arc<dyn Handler> {
    handler_fn(move |ctx: RequestContext| {
        let store = Arc::clone(&store);
        async move {
            let subject = ctx.subject()?;
            let user = store
                .find_user_by_email(&subject.identifier)
                .await?
                .ok_or_else(|| HandlerError::NotFound("user not found".to_string()))?;
            HandlerResponse::ok(&user)
        }
    })
}

fn user_by_id(store: Arc<dyn ProvenanceStore>) -> Arc<dyn Handler> {
    handler_fn(move |ctx: RequestContext| {
        let store = Arc::clone(&store);
        async move {
            let id: u64 = ctx
                .param("id")
                .unwrap_or_default()
                .parse()
                .map_err(|_| HandlerError::BadRequest("user id must be an integer".to_string()))?;

            let user = store
                .get_user(id)
                .await?
                .ok_or_else(|| HandlerError::NotFound(format!("user {} not found", id)))?;
            HandlerResponse::ok(&user)
        }
    })
}

fn create_user(store: Arc<dyn ProvenanceStore>) -> Arc<dyn Handler> {
    handler_fn(move |ctx: RequestContext| {
        let store = Arc::clone(&store);
        async move {
            let mut new_user: NewUser = ctx.json()?;
            new_user.email = new_user.email.trim().to_string();
            if new_user.email.is_empty() || !new_user.email.contains('@') {
                return Err(HandlerError::BadRequest(
                    "email must be a valid address".to_string(),
                ));
            }

            let creator = ctx.subject()?.identifier.clone();
            let user = store.create_user(new_user).await?;
            info!(user_id = user.id, created_by = %creator, "Created user");
            HandlerResponse::created(&user)
        }
    })
}
