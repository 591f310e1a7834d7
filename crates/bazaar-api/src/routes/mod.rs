mod addresses;
mod answers;
mod brands;
mod categories;
mod enquiries;
mod follows;
mod health;
mod messages;
mod notifications;
mod orders;
mod posts;
mod products;
mod projects;
mod questions;
mod reviews;
mod search;
mod users;

use axum::Router;
use axum::routing::{delete, get, patch, post};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health::healthz))
        // users and their delivery addresses
        .route("/v1/users", post(users::create))
        .route("/v1/users/me", get(users::me))
        .route("/v1/users/{userId}", get(users::get))
        .route(
            "/v1/users/me/addresses",
            post(addresses::create).get(addresses::list),
        )
        .route(
            "/v1/users/me/addresses/{addressId}",
            get(addresses::get)
                .patch(addresses::update)
                .delete(addresses::delete),
        )
        // category trees
        .route(
            "/v1/categories",
            post(categories::create).get(categories::list),
        )
        .route(
            "/v1/categories/{categoryId}",
            get(categories::get)
                .patch(categories::update)
                .delete(categories::delete),
        )
        .route(
            "/v1/categories/{categoryId}/subcategories",
            post(categories::add_sub_category).get(categories::list_sub_categories),
        )
        .route(
            "/v1/categories/{categoryId}/subcategories/{subCategoryId}",
            patch(categories::update_sub_category).delete(categories::delete_sub_category),
        )
        .route(
            "/v1/categories/{categoryId}/subcategories/{subCategoryId}/types",
            post(categories::add_type),
        )
        .route(
            "/v1/categories/{categoryId}/subcategories/{subCategoryId}/types/{typeId}",
            patch(categories::update_type).delete(categories::delete_type),
        )
        // catalogue
        .route("/v1/brands", post(brands::create).get(brands::list))
        .route("/v1/brands/{brandId}/approve", post(brands::approve))
        .route("/v1/products", post(products::create).get(products::list))
        .route("/v1/products/mine", get(products::mine))
        .route("/v1/products/search", get(products::search))
        .route("/v1/products/by-ids", post(products::by_ids))
        .route(
            "/v1/products/{productId}",
            get(products::get)
                .patch(products::update)
                .delete(products::delete),
        )
        .route("/v1/projects", post(projects::create).get(projects::list))
        .route("/v1/projects/mine", get(projects::mine))
        .route("/v1/projects/by-ids", post(projects::by_ids))
        .route(
            "/v1/projects/{projectId}",
            get(projects::get).delete(projects::delete),
        )
        .route("/v1/posts", post(posts::create).get(posts::list))
        .route("/v1/posts/mine", get(posts::mine))
        // questions, answers, reviews
        .route(
            "/v1/questions",
            post(questions::create).get(questions::list),
        )
        .route("/v1/questions/by-ids", post(questions::by_ids))
        .route(
            "/v1/questions/{questionId}",
            get(questions::get)
                .patch(questions::update)
                .delete(questions::delete),
        )
        .route("/v1/questions/{questionId}/vote", post(questions::vote))
        .route(
            "/v1/questions/{questionId}/answers",
            get(answers::list_for_question),
        )
        .route("/v1/answers", post(answers::create))
        .route(
            "/v1/answers/{answerId}",
            get(answers::get)
                .patch(answers::update)
                .delete(answers::delete),
        )
        .route("/v1/reviews", post(reviews::create))
        // The first segment is a review id, or the reviewed model when a
        // second segment follows. Both routes must share the segment name.
        .route(
            "/v1/reviews/{key}/{reviewableId}",
            get(reviews::list_for_item),
        )
        .route(
            "/v1/reviews/{key}",
            get(reviews::get)
                .patch(reviews::update)
                .delete(reviews::delete),
        )
        // orders, messaging, notifications
        .route("/v1/orders", post(orders::create).get(orders::list))
        .route(
            "/v1/orders/{orderId}",
            get(orders::get)
                .patch(orders::update)
                .delete(orders::delete),
        )
        .route("/v1/messages", post(messages::send).get(messages::thread))
        .route("/v1/messages/conversations", get(messages::conversations))
        .route(
            "/v1/messages/{messageId}",
            patch(messages::update).delete(messages::delete),
        )
        .route("/v1/notifications", get(notifications::list))
        .route("/v1/notifications/device", post(notifications::device))
        .route("/v1/notifications/devices", post(notifications::devices))
        .route("/v1/notifications/topic", post(notifications::topic))
        .route(
            "/v1/notifications/{notificationId}",
            delete(notifications::delete),
        )
        // follow graph
        .route("/v1/follow", post(follows::follow))
        .route("/v1/unfollow", post(follows::unfollow))
        .route("/v1/followers", get(follows::followers))
        .route("/v1/following", get(follows::following))
        .route("/v1/is-following/{targetUserId}", get(follows::is_following))
        // enquiries
        .route("/v1/enquiries", post(enquiries::create))
        .route("/v1/search", get(search::search))
}
