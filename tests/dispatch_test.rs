//! Dispatch behavior: classification, bounded retries, cancellation, and
//! epoch capture under concurrent invalidation.

use insightlink::client::{AnalysisClient, AnalysisRequest, WireResponse};
use insightlink::config::{RetryConfig, RetryStrategy};
use insightlink::endpoint::{EndpointResolver, EndpointSource, SourceKind, UrlRules};
use insightlink::errors::{DispatchError, TransportErrorKind, TransportFailure};
use insightlink::testkit::{fast_retry, ScriptedTransport};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const CURRENT: &str =
    r##"{"response":{"summary_ai":"Q3 revenue up 8%","presentation_md":"# Q3"},"format":"json","message":"Analysis completed successfully","model":"claude"}"##;
const DOCUMENT: &str = r#"{"response":{"summary":"Invoice from a Tokyo supplier","key_insights":["text extracted","analysis done"],"recommendations":["verify extracted data"],"data_analysis":{"total_records":1,"document_type":"image"}},"format":"json","message":"Image analysis completed","engine":"bedrock+textract","model":"deepseek.r1-v1:0"}"#;
const LEGACY: &str = r#"{"response":{"summary":"Data processed","key_insights":["a"],"recommendations":["b"]}}"#;

fn resolver() -> Arc<EndpointResolver> {
    Arc::new(EndpointResolver::new(
        vec![EndpointSource::new(
            SourceKind::EnvironmentVariable,
            Some("https://good.example/".into()),
        )],
        UrlRules::default(),
    ))
}

fn client_with(
    transport: ScriptedTransport,
    retry: RetryConfig,
) -> AnalysisClient<ScriptedTransport> {
    AnalysisClient::new(resolver(), transport, retry, "/analysis").unwrap()
}

fn slow_retry() -> RetryConfig {
    RetryConfig {
        enabled: true,
        max_retries: 4,
        base_delay_ms: 10_000,
        strategy: RetryStrategy::Constant,
        timeout_seconds: 60,
        jitter_factor: 0.0,
    }
}

fn request() -> AnalysisRequest {
    AnalysisRequest::from_bytes(r#"{"csv":"region,sales\nnorth,10","analysisType":"sales"}"#)
}

#[tokio::test]
async fn test_legacy_success_body_is_an_endpoint_mismatch() {
    let client = client_with(
        ScriptedTransport::new().respond(WireResponse::json(200, LEGACY)),
        fast_retry(4),
    );

    let err = client.analyze(&request()).await.unwrap_err();
    match &err {
        DispatchError::EndpointMismatch { endpoint, epoch, .. } => {
            assert_eq!(endpoint, "https://good.example/");
            assert_eq!(*epoch, 1);
        }
        other => panic!("expected mismatch, got {other:?}"),
    }
    assert!(err.suggests_reresolve());
    assert!(!err.is_retryable());
    assert_eq!(client.transport().attempts(), 1);
}

#[tokio::test]
async fn test_document_reply_is_a_success() {
    let client = client_with(
        ScriptedTransport::new().respond(WireResponse::json(200, DOCUMENT)),
        fast_retry(4),
    );

    let result = client.analyze(&request()).await.unwrap();
    assert_eq!(result.attempts, 1);
    assert_eq!(
        result.envelope().unwrap().summary(),
        Some("Invoice from a Tokyo supplier")
    );
}

#[tokio::test]
async fn test_html_fallthrough_is_an_endpoint_mismatch() {
    let mut page = WireResponse::new(200, "<!DOCTYPE html><html><body>app</body></html>");
    page.content_type = Some("text/html; charset=utf-8".into());
    let client = client_with(ScriptedTransport::new().respond(page), fast_retry(4));

    let err = client.analyze(&request()).await.unwrap_err();
    assert!(matches!(err, DispatchError::EndpointMismatch { .. }));
}

#[tokio::test]
async fn test_three_timeouts_then_success() {
    let client = client_with(
        ScriptedTransport::new()
            .fail(TransportFailure::timeout("request timed out"))
            .fail(TransportFailure::timeout("request timed out"))
            .fail(TransportFailure::timeout("request timed out"))
            .respond(WireResponse::json(200, CURRENT)),
        fast_retry(4),
    );

    let result = client.analyze(&request()).await.unwrap();
    assert_eq!(result.attempts, 4);
    assert!(result.attempts < 5);
    assert_eq!(result.envelope().unwrap().summary(), Some("Q3 revenue up 8%"));
    assert_eq!(client.transport().attempts(), 4);
    assert_eq!(client.transport().remaining(), 0);
}

#[tokio::test]
async fn test_client_errors_surface_verbatim_without_retry() {
    let body = r#"{"error":"No data provided for analysis"}"#;
    let client = client_with(
        ScriptedTransport::new().respond(WireResponse::json(400, body)),
        fast_retry(4),
    );

    let err = client.analyze(&request()).await.unwrap_err();
    assert_eq!(err, DispatchError::remote(400, body));
    assert!(err.is_user_fixable());
    assert_eq!(client.transport().attempts(), 1);
}

#[tokio::test]
async fn test_disabled_retry_sends_once() {
    let client = client_with(
        ScriptedTransport::new()
            .fail(TransportFailure::connection_refused("refused"))
            .respond(WireResponse::json(200, CURRENT)),
        RetryConfig::disabled(),
    );

    let err = client.analyze(&request()).await.unwrap_err();
    match err {
        DispatchError::Transport { attempts, last, .. } => {
            assert_eq!(attempts, 1);
            assert_eq!(last.kind, TransportErrorKind::ConnectionRefused);
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_during_backoff_stops_retries() {
    let client = client_with(
        ScriptedTransport::new()
            .fail(TransportFailure::timeout("slow"))
            .respond(WireResponse::json(200, CURRENT)),
        slow_retry(),
    );
    let token = CancellationToken::new();
    let trigger = token.clone();

    let started = Instant::now();
    let req = request();
    let (outcome, ()) = tokio::join!(client.analyze_with_cancel(&req, &token), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    assert_eq!(outcome.unwrap_err(), DispatchError::Cancelled { attempts: 1 });
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(client.transport().attempts(), 1);
    assert_eq!(client.transport().remaining(), 1);
}

#[tokio::test]
async fn test_cancel_mid_flight_abandons_attempt() {
    let client = client_with(
        ScriptedTransport::new().respond_after(
            Duration::from_secs(10),
            WireResponse::json(200, CURRENT),
        ),
        fast_retry(4),
    );
    let token = CancellationToken::new();
    let trigger = token.clone();

    let started = Instant::now();
    let req = request();
    let (outcome, ()) = tokio::join!(client.analyze_with_cancel(&req, &token), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    assert_eq!(outcome.unwrap_err(), DispatchError::Cancelled { attempts: 1 });
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_cancelling_one_call_leaves_others_running() {
    let shared = resolver();
    let doomed = AnalysisClient::new(
        Arc::clone(&shared),
        ScriptedTransport::new()
            .respond_after(Duration::from_secs(10), WireResponse::json(200, CURRENT)),
        fast_retry(4),
        "/analysis",
    )
    .unwrap();
    let survivor = AnalysisClient::new(
        Arc::clone(&shared),
        ScriptedTransport::new()
            .respond_after(Duration::from_millis(100), WireResponse::json(200, CURRENT)),
        fast_retry(4),
        "/analysis",
    )
    .unwrap();
    let doomed_token = CancellationToken::new();
    let trigger = doomed_token.clone();
    let survivor_token = CancellationToken::new();

    let doomed_request = request();
    let survivor_request = request();
    let (cancelled, finished, ()) = tokio::join!(
        doomed.analyze_with_cancel(&doomed_request, &doomed_token),
        survivor.analyze_with_cancel(&survivor_request, &survivor_token),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        }
    );

    assert!(matches!(cancelled, Err(DispatchError::Cancelled { .. })));
    let finished = finished.unwrap();
    assert_eq!(finished.epoch, 1);
    assert!(!survivor_token.is_cancelled());
}

#[tokio::test]
async fn test_invalidate_mid_flight_keeps_captured_epoch() {
    let client = client_with(
        ScriptedTransport::new()
            .respond_after(Duration::from_millis(200), WireResponse::json(200, CURRENT))
            .respond(WireResponse::json(200, CURRENT)),
        fast_retry(4),
    );

    let req = request();
    let (in_flight, rebound) = tokio::join!(client.analyze(&req), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.rebind()
    });

    assert_eq!(in_flight.unwrap().epoch, 1);
    assert_eq!(rebound.unwrap().epoch, 2);

    let next = client.analyze(&request()).await.unwrap();
    assert_eq!(next.epoch, 2);
}

#[tokio::test]
async fn test_retries_after_invalidate_stay_on_captured_epoch() {
    let retry = RetryConfig {
        base_delay_ms: 200,
        ..slow_retry()
    };
    let client = client_with(
        ScriptedTransport::new()
            .fail(TransportFailure::timeout("slow"))
            .respond(WireResponse::json(200, CURRENT)),
        retry,
    );

    let req = request();
    let (outcome, dropped) = tokio::join!(client.analyze(&req), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.resolver().invalidate()
    });

    let result = outcome.unwrap();
    assert_eq!(dropped, Some(1));
    assert_eq!(result.epoch, 1);
    assert_eq!(result.attempts, 2);
    let urls: Vec<String> = client
        .transport()
        .requests()
        .into_iter()
        .map(|r| r.url)
        .collect();
    assert_eq!(urls, vec!["https://good.example/analysis".to_string(); 2]);
    assert!(client.resolver().current().is_none());

    // Later calls wait for an explicit resolve instead of rebinding silently.
    let err = client.analyze(&request()).await.unwrap_err();
    assert_eq!(err, DispatchError::NotBound { epoch: 1 });
    assert_eq!(client.transport().attempts(), 2);
}

#[test]
fn test_client_construction_surfaces_configuration_errors() {
    let stale_only = Arc::new(EndpointResolver::new(
        vec![EndpointSource::new(
            SourceKind::CompiledDefault,
            Some("https://stale.example/api/analysis".into()),
        )],
        UrlRules::default(),
    ));

    let err = AnalysisClient::new(stale_only, ScriptedTransport::new(), fast_retry(4), "/analysis")
        .err()
        .unwrap();
    assert!(matches!(err, DispatchError::Configuration { .. }));
    assert_eq!(insightlink::commands::exit_code_for(&err), 3);
}

#[tokio::test]
async fn test_status_reflects_dispatch_binding() {
    let client = client_with(
        ScriptedTransport::new().respond(WireResponse::json(200, CURRENT)),
        fast_retry(0),
    );
    client.analyze(&request()).await.unwrap();

    let status = client.status();
    assert_eq!(status.epoch, 1);
    assert_eq!(status.provenance, Some(SourceKind::EnvironmentVariable));
    assert_eq!(
        status.endpoint.as_ref().map(|u| u.as_str()),
        Some("https://good.example/")
    );
}
