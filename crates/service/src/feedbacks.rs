use async_trait::async_trait;
use gateway::SentimentAnalyzer;
use model::request::{CreateFeedbackRequest, Validate};
use model::{Feedback, NewFeedback, Principal, Role, SentimentScore};
use repository::FeedbacksRepository;
use tracing::{info, instrument};

use crate::{ServiceError, require_role};

/// Feedback customers leave for organizers after completed orders.
#[async_trait]
pub trait FeedbackService: Send + Sync {
    async fn list_feedbacks(&self, to_user_id: Option<i64>) -> Result<Vec<Feedback>, ServiceError>;

    /// Each completed order entitles the customer to one feedback for its
    /// organizer. Returns [`ServiceError::Forbidden`] once they are used up.
    async fn create_feedback(
        &self,
        principal: Principal,
        request: CreateFeedbackRequest,
    ) -> Result<Feedback, ServiceError>;
}

pub struct FeedbackServiceImpl<F, A> {
    feedbacks: F,
    analyzer: A,
}

impl<F, A> FeedbackServiceImpl<F, A>
where
    F: FeedbacksRepository,
    A: SentimentAnalyzer,
{
    pub fn new(feedbacks: F, analyzer: A) -> Self {
        Self {
            feedbacks,
            analyzer,
        }
    }
}

#[async_trait]
impl<F, A> FeedbackService for FeedbackServiceImpl<F, A>
where
    F: FeedbacksRepository,
    A: SentimentAnalyzer,
{
    async fn list_feedbacks(&self, to_user_id: Option<i64>) -> Result<Vec<Feedback>, ServiceError> {
        Ok(self.feedbacks.list(to_user_id).await?)
    }

    #[instrument(skip(self, request), fields(to_user_id = request.to_user_id))]
    async fn create_feedback(
        &self,
        principal: Principal,
        request: CreateFeedbackRequest,
    ) -> Result<Feedback, ServiceError> {
        require_role(&principal, Role::Customer)?;
        request.validate()?;

        let from_user_id = principal.user_id;
        let given = self
            .feedbacks
            .feedbacks_count(from_user_id, request.to_user_id)
            .await?;
        let completed = self
            .feedbacks
            .completed_orders_count(from_user_id, request.to_user_id)
            .await?;
        if given >= completed {
            return Err(ServiceError::Forbidden);
        }

        let score = self.analyzer.analyze(&request.description).await?;
        let new_feedback = NewFeedback {
            description: request.description,
            rating: request.rating,
            sentiment: SentimentScore::from_polarity(score),
            from_user_id,
            to_user_id: request.to_user_id,
        };

        let feedback = self
            .feedbacks
            .insert_if_eligible(&new_feedback)
            .await?
            .ok_or(ServiceError::Forbidden)?;
        info!(feedback_id = feedback.id, score, "feedback created");
        Ok(feedback)
    }
}
