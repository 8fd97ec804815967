use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::database::models::{Shift, ShiftInput, ShiftQuery};
use crate::database::repositories::{shift as shift_repo, station as station_repo};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::feed::ShiftFeed;
use crate::services::lifecycle::{self, TransitionOutcome};
use crate::services::notifier::NotificationDispatcher;
use crate::services::user_context::extract_context;

/// Post-transition side effects: hand the lifecycle event to the
/// dispatcher and push the fresh snapshot onto the live feed. Neither may
/// fail the request that caused the transition.
async fn publish_transition(
    shift: &Shift,
    outcome: &TransitionOutcome,
    dispatcher: &NotificationDispatcher,
    feed: &ShiftFeed,
) {
    if let Some(ref event) = outcome.event {
        if let Err(e) = dispatcher.dispatch(event).await {
            log::warn!(
                "Failed to dispatch lifecycle event for shift {}: {}",
                shift.id,
                e
            );
        }
    }

    feed.publish(shift.clone(), outcome.event.clone());
}

pub async fn create_shift(
    input: web::Json<ShiftInput>,
    req: HttpRequest,
    feed: web::Data<ShiftFeed>,
) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;
    user_context.requires_admin()?;

    let input = input.into_inner();
    lifecycle::validate_shift_input(&input)?;

    if !station_repo::station_exists(input.station_id).await? {
        return Err(AppError::Validation("Unknown station".to_string()));
    }

    let shift = shift_repo::create_shift(&input, user_context.user_id()).await?;

    log::info!(
        "Shift {} posted for station {} on {}",
        shift.id,
        shift.station_id,
        shift.date
    );
    feed.publish(shift.clone(), None);

    Ok(ApiResponse::created(shift))
}

pub async fn get_shifts(
    query: web::Query<ShiftQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;

    let shifts = shift_repo::find_by_query(&query.into_inner(), user_context.role()).await?;

    Ok(ApiResponse::success(shifts))
}

pub async fn get_shift(path: web::Path<Uuid>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    extract_context(&req).await?;

    let shift_id = path.into_inner();
    let details = shift_repo::get_details(shift_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

    Ok(ApiResponse::success(details))
}

/// Applications for a shift in applied-at order, for admin review.
pub async fn get_shift_applications(
    path: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;
    user_context.requires_admin()?;

    let shift_id = path.into_inner();
    if shift_repo::find_by_id(shift_id).await?.is_none() {
        return Err(AppError::NotFound("Shift not found".to_string()));
    }

    let applications = shift_repo::get_applications(shift_id).await?;

    Ok(ApiResponse::success(applications))
}

pub async fn get_my_applications(req: HttpRequest) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;

    let applications = shift_repo::get_applications_by_user(user_context.user_id()).await?;

    Ok(ApiResponse::success(applications))
}

pub async fn apply_to_shift(
    path: web::Path<Uuid>,
    req: HttpRequest,
    dispatcher: web::Data<NotificationDispatcher>,
    feed: web::Data<ShiftFeed>,
) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;
    let actor = user_context.actor();
    let shift_id = path.into_inner();

    let (shift, outcome) =
        shift_repo::run_transition(shift_id, |snapshot| {
            lifecycle::apply_to_shift(snapshot, &actor)
        })
        .await?;

    publish_transition(&shift, &outcome, &dispatcher, &feed).await;

    Ok(ApiResponse::success_with_message(
        shift,
        "Application submitted",
    ))
}

pub async fn withdraw_application(
    path: web::Path<(Uuid, Uuid)>,
    req: HttpRequest,
    dispatcher: web::Data<NotificationDispatcher>,
    feed: web::Data<ShiftFeed>,
) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;
    let actor = user_context.actor();
    let (shift_id, application_id) = path.into_inner();

    let (shift, outcome) = shift_repo::run_transition(shift_id, |snapshot| {
        lifecycle::withdraw_application(snapshot, application_id, &actor)
    })
    .await?;

    publish_transition(&shift, &outcome, &dispatcher, &feed).await;

    Ok(ApiResponse::success_with_message(
        shift,
        "Application withdrawn",
    ))
}

pub async fn approve_applicant(
    path: web::Path<(Uuid, Uuid)>,
    req: HttpRequest,
    dispatcher: web::Data<NotificationDispatcher>,
    feed: web::Data<ShiftFeed>,
) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;
    let actor = user_context.actor();
    let (shift_id, application_id) = path.into_inner();

    let (shift, outcome) = shift_repo::run_transition(shift_id, |snapshot| {
        lifecycle::approve_applicant(snapshot, application_id, &actor)
    })
    .await?;

    publish_transition(&shift, &outcome, &dispatcher, &feed).await;

    Ok(ApiResponse::success_with_message(
        shift,
        "Applicant approved",
    ))
}

pub async fn reject_applicant(
    path: web::Path<(Uuid, Uuid)>,
    req: HttpRequest,
    dispatcher: web::Data<NotificationDispatcher>,
    feed: web::Data<ShiftFeed>,
) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;
    let actor = user_context.actor();
    let (shift_id, application_id) = path.into_inner();

    let (shift, outcome) = shift_repo::run_transition(shift_id, |snapshot| {
        lifecycle::reject_applicant(snapshot, application_id, &actor)
    })
    .await?;

    publish_transition(&shift, &outcome, &dispatcher, &feed).await;

    Ok(ApiResponse::success_with_message(
        shift,
        "Applicant rejected",
    ))
}

/// Manual override for out-of-band assignment.
pub async fn mark_filled(
    path: web::Path<Uuid>,
    req: HttpRequest,
    dispatcher: web::Data<NotificationDispatcher>,
    feed: web::Data<ShiftFeed>,
) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;
    let actor = user_context.actor();
    let shift_id = path.into_inner();

    let (shift, outcome) =
        shift_repo::run_transition(shift_id, |snapshot| lifecycle::mark_filled(snapshot, &actor))
            .await?;

    publish_transition(&shift, &outcome, &dispatcher, &feed).await;

    Ok(ApiResponse::success_with_message(
        shift,
        "Shift marked as filled",
    ))
}

pub async fn reopen_shift(
    path: web::Path<Uuid>,
    req: HttpRequest,
    dispatcher: web::Data<NotificationDispatcher>,
    feed: web::Data<ShiftFeed>,
) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;
    let actor = user_context.actor();
    let shift_id = path.into_inner();

    let (shift, outcome) =
        shift_repo::run_transition(shift_id, |snapshot| lifecycle::reopen_shift(snapshot, &actor))
            .await?;

    publish_transition(&shift, &outcome, &dispatcher, &feed).await;

    Ok(ApiResponse::success_with_message(shift, "Shift reopened"))
}

pub async fn cancel_shift(
    path: web::Path<Uuid>,
    req: HttpRequest,
    dispatcher: web::Data<NotificationDispatcher>,
    feed: web::Data<ShiftFeed>,
) -> Result<HttpResponse, AppError> {
    let user_context = extract_context(&req).await?;
    let actor = user_context.actor();
    let shift_id = path.into_inner();

    let (shift, outcome) =
        shift_repo::run_transition(shift_id, |snapshot| lifecycle::cancel_shift(snapshot, &actor))
            .await?;

    publish_transition(&shift, &outcome, &dispatcher, &feed).await;

    Ok(ApiResponse::success_with_message(shift, "Shift cancelled"))
}

/// Server-sent events stream of shift mutations. Closing the connection
/// drops the subscription.
pub async fn shift_feed(
    req: HttpRequest,
    feed: web::Data<ShiftFeed>,
) -> Result<HttpResponse, AppError> {
    extract_context(&req).await?;

    let subscription = feed.subscribe();
    let stream = futures_util::stream::unfold(subscription, |mut subscription| async move {
        let update = subscription.next().await?;
        let payload = serde_json::to_string(&update).ok()?;
        let chunk = web::Bytes::from(format!("data: {}\n\n", payload));
        Some((Ok::<_, actix_web::Error>(chunk), subscription))
    });

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream))
}
