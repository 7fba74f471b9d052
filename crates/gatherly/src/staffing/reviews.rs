use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Application, EventListing, HostId, Review, ReviewVisibility, Session, StaffRole, StarRating,
    ValidationError,
};

/// Fields a team leader fills in after the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub star_rating: u8,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    #[error("only the event's team leader can review it")]
    NotTeamLeader,
    #[error("reviews open once the event has ended")]
    EventNotFinished,
    #[error("this event has already been reviewed")]
    AlreadyReviewed,
    #[error("only admins can change review visibility")]
    AdminOnly,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Create the single post-event review for `event`.
///
/// `assignment` is the author's application for the event, if any. New reviews start private.
pub fn submit_review(
    event: &EventListing,
    author: &HostId,
    assignment: Option<&Application>,
    draft: ReviewDraft,
    now: DateTime<Utc>,
    existing: Option<&Review>,
) -> Result<Review, ReviewError> {
    let leads_event = assignment
        .filter(|application| {
            &application.host_id == author
                && application.event_id == event.id
                && application.is_accepted()
        })
        .and_then(|application| application.assigned_role)
        == Some(StaffRole::TeamLeader);
    if !leads_event {
        return Err(ReviewError::NotTeamLeader);
    }

    if !event.has_ended(now) {
        return Err(ReviewError::EventNotFinished);
    }

    if existing.is_some() {
        return Err(ReviewError::AlreadyReviewed);
    }

    let star_rating = StarRating::new(draft.star_rating)?;
    let content = draft.content.trim();
    if content.is_empty() {
        return Err(ValidationError::Blank("review content").into());
    }

    Ok(Review {
        event_id: event.id.clone(),
        author_id: author.clone(),
        star_rating,
        content: content.to_string(),
        visibility: ReviewVisibility::Private,
    })
}

/// Admin-only visibility change.
pub fn set_visibility(
    session: &Session,
    review: &Review,
    visibility: ReviewVisibility,
) -> Result<Review, ReviewError> {
    if !session.is_admin() {
        return Err(ReviewError::AdminOnly);
    }

    let mut updated = review.clone();
    updated.visibility = visibility;
    Ok(updated)
}
