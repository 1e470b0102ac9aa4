use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tracing::info;

use crate::handlers::api::{
    cancel_occurrence, create_meeting, create_past_meeting, create_registrant, delete_meeting,
    delete_past_meeting, delete_registrant, get_meeting, get_meeting_settings, get_participant,
    get_past_meeting, get_registrant, get_summary, handle_provider_webhook, list_meetings,
    list_occurrences, list_participants, list_past_meetings, list_registrants, list_rsvps,
    list_summaries, resend_invitation, submit_rsvp, update_meeting, update_meeting_settings,
    update_occurrence, update_participant, update_registrant, update_summary, AppState,
};
use crate::handlers::test::health_check;

pub fn create_router(app_state: Arc<AppState>, is_production: bool) -> Router {
    let mut router = Router::new();

    // Health check is always available
    let health_route = Router::new().route("/health", get(health_check));
    router = router.merge(health_route);

    // Webhook endpoint is always available
    let webhook_route = Router::new().route("/webhook/provider", post(handle_provider_webhook));
    router = router.merge(webhook_route);

    // Only add management API routes if not in production mode
    if !is_production {
        let api_routes = Router::new()
            .route("/meetings", get(list_meetings).post(create_meeting))
            .route(
                "/meetings/:uid",
                get(get_meeting).put(update_meeting).delete(delete_meeting),
            )
            .route(
                "/meetings/:uid/settings",
                get(get_meeting_settings).put(update_meeting_settings),
            )
            .route("/meetings/:uid/occurrences", get(list_occurrences))
            .route(
                "/meetings/:uid/occurrences/:occurrence_id",
                put(update_occurrence),
            )
            .route(
                "/meetings/:uid/occurrences/:occurrence_id/cancel",
                post(cancel_occurrence),
            )
            .route(
                "/meetings/:uid/registrants",
                get(list_registrants).post(create_registrant),
            )
            .route(
                "/registrants/:uid",
                get(get_registrant)
                    .put(update_registrant)
                    .delete(delete_registrant),
            )
            .route(
                "/registrants/:uid/resend-invitation",
                post(resend_invitation),
            )
            .route("/meetings/:uid/rsvps", get(list_rsvps).post(submit_rsvp))
            .route(
                "/past-meetings",
                get(list_past_meetings).post(create_past_meeting),
            )
            .route(
                "/past-meetings/:uid",
                get(get_past_meeting).delete(delete_past_meeting),
            )
            .route("/past-meetings/:uid/participants", get(list_participants))
            .route(
                "/past-meeting-participants/:uid",
                get(get_participant).put(update_participant),
            )
            .route("/past-meetings/:uid/summaries", get(list_summaries))
            .route(
                "/past-meeting-summaries/:uid",
                get(get_summary).put(update_summary),
            );

        router = router.merge(api_routes);

        info!("Management API routes enabled - server running in development mode");
    } else {
        info!("Running in production mode - only webhook and health endpoints exposed");
    }

    router.with_state(app_state)
}
