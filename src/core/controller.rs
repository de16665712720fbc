use crate::core::conversation::AnalysisRequest;
use crate::core::model::ModelClient;
use crate::core::prompt::PromptBuilder;
use crate::core::session::{Effect, Session, SessionEvent};
use crate::core::transcript::TranscriptProvider;
use crate::error::Result;

/// Builds the payload for one request and calls the model.
pub async fn generate_reply<M: ModelClient>(
    prompts: &PromptBuilder,
    model: &M,
    request: &AnalysisRequest,
) -> Result<String> {
    let payload = prompts.build(request)?;
    model.generate(&payload).await
}

/// Runs each session event to completion: fetch, format, prompt, model, record.
pub struct Controller<P, M> {
    session: Session,
    provider: P,
    model: M,
    prompts: PromptBuilder,
}

impl<P, M> Controller<P, M>
where
    P: TranscriptProvider,
    M: ModelClient,
{
    pub fn new(provider: P, model: M, prompts: PromptBuilder) -> Self {
        Self {
            session: Session::new(),
            provider,
            model,
            prompts,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the assistant reply when the event produced one.
    pub async fn dispatch(&mut self, event: SessionEvent) -> Result<Option<String>> {
        match self.session.handle(event)? {
            Effect::None => Ok(None),
            Effect::FetchTranscript(ticket) => {
                let outcome = self.provider.fetch(&ticket.video_id).await;
                self.session.transcript_loaded(ticket.epoch, outcome)?;
                Ok(None)
            }
            Effect::CallModel(ticket) => {
                let outcome = generate_reply(&self.prompts, &self.model, &ticket.request).await;
                self.session.response_received(ticket.epoch, outcome)?;
                Ok(self.session.history().last().map(|t| t.content.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversation::{Role, is_alternating};
    use crate::core::prompt::ModelRequest;
    use crate::core::session::SessionState;
    use crate::core::transcript::{Transcript, TranscriptSegment, TranscriptSource};
    use crate::error::Error;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockProvider {
        calls: Arc<Mutex<Vec<String>>>,
        unavailable: bool,
    }

    impl TranscriptProvider for MockProvider {
        async fn fetch(&self, video_id: &str) -> Result<Transcript> {
            self.calls.lock().unwrap().push(video_id.to_string());
            if self.unavailable {
                return Err(Error::TranscriptUnavailable("captions disabled".into()));
            }
            Ok(Transcript::new(
                video_id,
                "en",
                TranscriptSource::Youtube,
                vec![
                    TranscriptSegment::new(0.0, 1.2, "Never"),
                    TranscriptSegment::new(1.2, 2.3, "gonna give you up"),
                ],
            ))
        }
    }

    /// Replies "reply N" unless a scripted failure is queued.
    #[derive(Clone, Default)]
    struct MockModel {
        requests: Arc<Mutex<Vec<ModelRequest>>>,
        failures: Arc<Mutex<VecDeque<Error>>>,
    }

    impl MockModel {
        fn fail_next(&self, error: Error) {
            self.failures.lock().unwrap().push_back(error);
        }
    }

    impl ModelClient for MockModel {
        async fn generate(&self, request: &ModelRequest) -> Result<String> {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            if let Some(err) = self.failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            Ok(format!("reply {}", requests.len()))
        }
    }

    fn controller(
        provider: MockProvider,
        model: MockModel,
        budget: usize,
    ) -> Controller<MockProvider, MockModel> {
        Controller::new(provider, model, PromptBuilder::new(budget))
    }

    const URL: &str = "https://youtube.com/watch?v=dQw4w9WgXcQ";

    #[tokio::test]
    async fn fetches_transcript_and_formats_it_for_the_prompt() {
        let provider = MockProvider::default();
        let model = MockModel::default();
        let calls = provider.calls.clone();
        let requests = model.requests.clone();
        let mut ctl = controller(provider, model, 100_000);

        ctl.dispatch(SessionEvent::SubmitVideo(URL.into())).await.unwrap();
        assert_eq!(calls.lock().unwrap().as_slice(), ["dQw4w9WgXcQ"]);
        assert_eq!(ctl.session().state(), SessionState::Ready);

        let reply = ctl
            .dispatch(SessionEvent::SubmitMessage("titles please".into()))
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("reply 1"));

        let requests = requests.lock().unwrap();
        assert!(requests[0].system[1].contains("Never gonna give you up"));
    }

    #[tokio::test]
    async fn model_sees_full_history_on_every_call() {
        let model = MockModel::default();
        let requests = model.requests.clone();
        let mut ctl = controller(MockProvider::default(), model, 100_000);
        ctl.dispatch(SessionEvent::SubmitVideo(URL.into())).await.unwrap();

        for i in 0..3 {
            ctl.dispatch(SessionEvent::SubmitMessage(format!("q{i}")))
                .await
                .unwrap();
        }

        let sizes: Vec<usize> = requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.messages.len())
            .collect();
        assert_eq!(sizes, [1, 3, 5]);
        assert_eq!(ctl.session().history().len(), 6);
        assert!(is_alternating(ctl.session().history()));
    }

    #[tokio::test]
    async fn malformed_url_never_reaches_the_provider() {
        let provider = MockProvider::default();
        let calls = provider.calls.clone();
        let mut ctl = controller(provider, MockModel::default(), 100_000);

        let err = ctl
            .dispatch(SessionEvent::SubmitVideo("https://example.com/video".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidUrl(_)));
        assert_eq!(ctl.session().state(), SessionState::Idle);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_transcript_returns_to_idle() {
        let provider = MockProvider {
            unavailable: true,
            ..Default::default()
        };
        let mut ctl = controller(provider, MockModel::default(), 100_000);

        let err = ctl
            .dispatch(SessionEvent::SubmitVideo(URL.into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TranscriptUnavailable(_)));
        assert_eq!(ctl.session().state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn auth_error_is_surfaced_and_history_is_unchanged() {
        let model = MockModel::default();
        let mut ctl = controller(MockProvider::default(), model.clone(), 100_000);
        ctl.dispatch(SessionEvent::SubmitVideo(URL.into())).await.unwrap();
        ctl.dispatch(SessionEvent::SubmitMessage("first".into()))
            .await
            .unwrap();
        let before = ctl.session().history().to_vec();

        model.fail_next(Error::Auth("The security token included in the request is expired".into()));
        let err = ctl
            .dispatch(SessionEvent::SubmitMessage("second".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Auth(_)));
        assert_eq!(ctl.session().state(), SessionState::Ready);
        assert_eq!(ctl.session().history(), &before[..]);

        // The user can resubmit once the problem is fixed.
        ctl.dispatch(SessionEvent::SubmitMessage("second".into()))
            .await
            .unwrap();
        assert_eq!(ctl.session().history().len(), 4);
    }

    #[tokio::test]
    async fn oversized_payload_reverts_without_calling_the_model() {
        let model = MockModel::default();
        let requests = model.requests.clone();
        let mut ctl = controller(MockProvider::default(), model, 1_000);
        ctl.dispatch(SessionEvent::SubmitVideo(URL.into())).await.unwrap();

        let err = ctl
            .dispatch(SessionEvent::SubmitMessage("x".repeat(5_000)))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PayloadTooLarge { .. }));
        assert_eq!(ctl.session().state(), SessionState::Ready);
        assert!(ctl.session().history().is_empty());
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn new_video_resets_conversation() {
        let mut ctl = controller(MockProvider::default(), MockModel::default(), 100_000);
        ctl.dispatch(SessionEvent::SubmitVideo(URL.into())).await.unwrap();
        ctl.dispatch(SessionEvent::SubmitMessage("one".into()))
            .await
            .unwrap();
        assert_eq!(ctl.session().history().len(), 2);

        ctl.dispatch(SessionEvent::SubmitVideo("https://youtu.be/aaaaaaaaaaa".into()))
            .await
            .unwrap();
        assert!(ctl.session().history().is_empty());
        assert_eq!(ctl.session().video_id(), Some("aaaaaaaaaaa"));
    }

    #[tokio::test]
    async fn documents_can_be_analyzed_without_a_video() {
        let provider = MockProvider::default();
        let calls = provider.calls.clone();
        let mut ctl = controller(provider, MockModel::default(), 100_000);

        ctl.dispatch(SessionEvent::LoadDocument {
            name: "episode.txt".into(),
            content: "Welcome back to the channel".into(),
        })
        .await
        .unwrap();
        let reply = ctl
            .dispatch(SessionEvent::SubmitMessage("summary?".into()))
            .await
            .unwrap();

        assert!(reply.is_some());
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(ctl.session().history()[1].role, Role::Assistant);
    }
}
