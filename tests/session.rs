//! Session state-machine tests: load, convert, supersede, keep prior output.

mod common;

use common::{gate, source, FakeBackend, Gate};
use edgequake_pdf2img::{
    ConversionSession, ConversionSettings, DocumentAnalysis, Pdf2ImgError, SessionState,
    Summarizer,
};
use futures::future::{BoxFuture, FutureExt};
use std::sync::{Arc, Mutex};

fn settings(range: &str) -> ConversionSettings {
    ConversionSettings::builder().page_range(range).build().unwrap()
}

fn pages_of(session: &ConversionSession) -> Vec<usize> {
    session.artifacts().iter().map(|a| a.page_num).collect()
}

/// Records the text it was asked to summarise.
#[derive(Default)]
struct RecordingSummarizer {
    inputs: Mutex<Vec<String>>,
}

impl Summarizer for RecordingSummarizer {
    fn summarize<'a>(&'a self, text: &'a str) -> BoxFuture<'a, DocumentAnalysis> {
        self.inputs.lock().unwrap().push(text.to_string());
        async move {
            DocumentAnalysis {
                summary: "A fixture.".into(),
                suggested_tags: vec!["test".into()],
            }
        }
        .boxed()
    }
}

#[tokio::test]
async fn load_then_convert() {
    let backend = FakeBackend::with_pages(4);
    let session = ConversionSession::with_backend(backend.factory());
    assert_eq!(session.state(), SessionState::Empty);

    assert_eq!(session.load(source()).await.unwrap(), 4);
    assert_eq!(session.page_count(), 4);
    assert_eq!(session.state(), SessionState::AwaitingInput);

    let outcome = session.convert(&settings("1-2"), None).await.unwrap();
    assert!(!outcome.is_superseded());
    assert_eq!(session.state(), SessionState::Converted);
    assert_eq!(pages_of(&session), vec![1, 2]);
    assert_eq!(session.extracted_text(), "p1 p2");
}

#[tokio::test]
async fn convert_without_document_is_rejected() {
    let session = ConversionSession::with_backend(FakeBackend::with_pages(1).factory());
    let err = session.convert(&settings(""), None).await.unwrap_err();
    assert!(matches!(err, Pdf2ImgError::InvalidConfig(_)));
    assert_eq!(session.state(), SessionState::Empty);
}

#[tokio::test]
async fn empty_selection_keeps_previous_artifacts() {
    let session = ConversionSession::with_backend(FakeBackend::with_pages(5).factory());
    session.load(source()).await.unwrap();
    session.convert(&settings("2-3"), None).await.unwrap();

    let err = session.convert(&settings("10-20"), None).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(session.state(), SessionState::AwaitingInput);
    assert_eq!(pages_of(&session), vec![2, 3]);
}

#[tokio::test]
async fn render_failure_keeps_previous_artifacts() {
    let backend = FakeBackend::with_pages(5).failing_render(4);
    let session = ConversionSession::with_backend(backend.factory());
    session.load(source()).await.unwrap();
    session.convert(&settings("1"), None).await.unwrap();

    let err = session.convert(&settings(""), None).await.unwrap_err();
    assert_eq!(err.failed_page(), Some(4));
    assert_eq!(pages_of(&session), vec![1]);
}

#[tokio::test]
async fn failed_load_clears_the_session() {
    let mut corrupt = FakeBackend::with_pages(2);
    corrupt.corrupt = true;
    let session = ConversionSession::with_backend(corrupt.factory());
    let err = session.load(source()).await.unwrap_err();
    assert!(matches!(err, Pdf2ImgError::CorruptPdf { .. }));
    assert_eq!(session.state(), SessionState::Empty);
    assert_eq!(session.page_count(), 0);
}

#[tokio::test]
async fn newer_convert_supersedes_in_flight_run() {
    let (gate, entered, release) = gate();
    let mut backend = FakeBackend::with_pages(3);
    backend.gate = Some(gate);
    let session = ConversionSession::with_backend(backend.factory());
    session.load(source()).await.unwrap();

    let first_settings = settings("");
    let second_settings = settings("3");
    let first = session.convert(&first_settings, None);
    let second = async {
        entered.await.unwrap();
        let result = session.convert(&second_settings, None).await;
        release.send(()).unwrap();
        result
    };

    let (first, second) = tokio::join!(first, second);

    assert!(first.unwrap().is_superseded());
    let second = second.unwrap().completed().unwrap();
    assert_eq!(second.artifacts.len(), 1);
    assert_eq!(pages_of(&session), vec![3]);
    assert_eq!(session.state(), SessionState::Converted);
}

#[tokio::test]
async fn load_supersedes_convert_started_while_opening() {
    let (render_gate, render_entered, release_render) = gate();
    let (open_gate, open_entered, release_open) = gate();
    let mut backend = FakeBackend::with_pages(3);
    backend.gate = Some(render_gate);

    // Only backend constructions made after arming block on the open gate.
    let armed: Gate = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&armed);
    let session = ConversionSession::with_backend(move || {
        let waiting = slot.lock().unwrap().take();
        if let Some((entered, release)) = waiting {
            let _ = entered.send(());
            let _ = release.recv();
        }
        Ok(backend.clone())
    });
    session.load(source()).await.unwrap();
    *armed.lock().unwrap() = open_gate.lock().unwrap().take();

    let all_pages = settings("");
    let reload = async {
        let pages = session.load(source()).await;
        release_render.send(()).unwrap();
        pages
    };
    let stale = async {
        open_entered.await.unwrap();
        session.convert(&all_pages, None).await
    };
    let driver = async {
        render_entered.await.unwrap();
        release_open.send(()).unwrap();
    };

    let (reloaded, stale, ()) = tokio::join!(reload, stale, driver);

    assert_eq!(reloaded.unwrap(), 3);
    assert!(stale.unwrap().is_superseded());
    assert_eq!(session.state(), SessionState::AwaitingInput);
    assert!(session.artifacts().is_empty());
    assert!(session.extracted_text().is_empty());
}

#[tokio::test]
async fn reset_supersedes_and_clears() {
    let session = ConversionSession::with_backend(FakeBackend::with_pages(2).factory());
    session.load(source()).await.unwrap();
    session.convert(&settings(""), None).await.unwrap();

    session.reset();
    assert_eq!(session.state(), SessionState::Empty);
    assert!(session.artifacts().is_empty());
    assert_eq!(session.page_count(), 0);
}

#[tokio::test]
async fn summary_is_dispatched_after_success() {
    let summarizer = Arc::new(RecordingSummarizer::default());
    let session = ConversionSession::with_backend(FakeBackend::with_pages(5).factory())
        .with_summarizer(summarizer.clone());
    session.load(source()).await.unwrap();
    session.convert(&settings(""), None).await.unwrap();

    let analysis = session.take_analysis().expect("summary dispatched").await.unwrap();
    assert_eq!(analysis.summary, "A fixture.");
    assert_eq!(*summarizer.inputs.lock().unwrap(), vec!["p1 p2 p3".to_string()]);
    assert!(session.take_analysis().is_none());
}

#[tokio::test]
async fn no_summary_for_blank_text() {
    let summarizer = Arc::new(RecordingSummarizer::default());
    let backend = FakeBackend::with_pages(2).failing_text(1).failing_text(2);
    let session =
        ConversionSession::with_backend(backend.factory()).with_summarizer(summarizer.clone());
    session.load(source()).await.unwrap();
    session.convert(&settings(""), None).await.unwrap();

    assert!(session.take_analysis().is_none());
    assert!(summarizer.inputs.lock().unwrap().is_empty());
}
