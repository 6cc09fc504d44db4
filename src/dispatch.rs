//! Direct dispatch to a provider matched by orchestration
//!
//! The capability token rides as a `token` query parameter, the wire
//! convention providers in this system expect. The dispatcher never
//! interprets payload semantics; success hands back the raw bytes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;

use crate::models::{HTTP_METHOD_KEY, HttpMethod, MatchedService, SECURE_JSON_INTERFACE};
use crate::transport::{HttpTransport, WireRequest};
use crate::{Error, Result};

/// Sends authenticated calls to matched providers
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn HttpTransport>,
    tls: bool,
    timeout: Duration,
}

impl Dispatcher {
    /// Build a dispatcher over the shared transport
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, tls: bool, timeout: Duration) -> Self {
        Self {
            transport,
            tls,
            timeout,
        }
    }

    /// Call the matched provider with the caller's query parameters and
    /// payload, returning the raw response body
    ///
    /// # Errors
    ///
    /// [`Error::MissingToken`] when the token map lacks the interface in
    /// use, [`Error::MissingMethod`] when the metadata declares no HTTP
    /// method — both checked before any network call — and
    /// [`Error::Dispatch`] on a non-2xx response.
    pub async fn send(
        &self,
        matched: &MatchedService,
        query_params: &HashMap<String, String>,
        payload: Option<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let token = matched
            .authorization_tokens
            .get(SECURE_JSON_INTERFACE)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::MissingToken(SECURE_JSON_INTERFACE.to_string()))?;

        let method: HttpMethod = matched
            .metadata
            .get(HTTP_METHOD_KEY)
            .ok_or(Error::MissingMethod)?
            .parse()
            .map_err(|_| Error::MissingMethod)?;

        let url = self.build_url(matched, token, query_params);
        tracing::debug!(%method, %url, "dispatching to provider");

        let request = WireRequest::json(as_reqwest(method), url.clone(), payload, self.timeout);
        let response = self.transport.request(request).await?;

        if !(200..300).contains(&response.status) {
            return Err(Error::Dispatch {
                status: response.status,
                body: response.text(),
            });
        }

        Ok(response.body)
    }

    fn build_url(
        &self,
        matched: &MatchedService,
        token: &str,
        query_params: &HashMap<String, String>,
    ) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        let mut url = format!(
            "{scheme}://{}:{}{}?token={}",
            matched.provider.address,
            matched.provider.port,
            matched.service_uri,
            urlencoding::encode(token)
        );

        for (key, value) in query_params {
            url.push('&');
            url.push_str(&urlencoding::encode(key));
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }

        url
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tls", &self.tls)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn as_reqwest(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::models::{Provider, ServiceDefinition};
    use crate::transport::WireResponse;

    /// Transport double that counts calls and replays a scripted response
    struct MockTransport {
        calls: AtomicUsize,
        status: u16,
        body: Vec<u8>,
        last_url: std::sync::Mutex<Option<String>>,
    }

    impl MockTransport {
        fn returning(status: u16, body: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                status,
                body: body.to_vec(),
                last_url: std::sync::Mutex::new(None),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn request(&self, request: WireRequest) -> Result<WireResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_url.lock().unwrap() = Some(request.url);
            Ok(WireResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    fn matched(tokens: &[(&str, &str)], metadata: &[(&str, &str)]) -> MatchedService {
        MatchedService {
            provider: Provider {
                id: 3,
                system_name: "carfactory".to_string(),
                address: "10.0.0.5".to_string(),
                port: 8080,
                authentication_info: None,
                metadata: None,
                created_at: None,
                updated_at: None,
            },
            service_definition: ServiceDefinition {
                id: 11,
                service_definition: "create-car".to_string(),
                created_at: None,
                updated_at: None,
            },
            service_uri: "/car-factory/create-car".to_string(),
            secure: "TOKEN".to_string(),
            metadata: metadata
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            interfaces: vec![],
            version: 1,
            authorization_tokens: tokens
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            warnings: vec![],
        }
    }

    fn dispatcher(transport: Arc<MockTransport>) -> Dispatcher {
        Dispatcher::new(transport, true, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_missing_token_makes_no_network_call() {
        let transport = MockTransport::returning(200, b"ok");
        let service = matched(&[], &[("http-method", "POST")]);

        let err = dispatcher(transport.clone())
            .send(&service, &HashMap::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingToken(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_method_makes_no_network_call() {
        let transport = MockTransport::returning(200, b"ok");
        let service = matched(&[("HTTP-SECURE-JSON", "tok")], &[]);

        let err = dispatcher(transport.clone())
            .send(&service, &HashMap::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingMethod));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_token_rides_as_query_parameter() {
        let transport = MockTransport::returning(200, br#"{"status":"success"}"#);
        let service = matched(&[("HTTP-SECURE-JSON", "tok en")], &[("http-method", "POST")]);

        let mut query = HashMap::new();
        query.insert("limit".to_string(), "5".to_string());

        let body = dispatcher(transport.clone())
            .send(&service, &query, Some(b"{}".to_vec()))
            .await
            .unwrap();

        assert_eq!(body, br#"{"status":"success"}"#);
        let url = transport.last_url.lock().unwrap().clone().unwrap();
        assert!(url.starts_with("https://10.0.0.5:8080/car-factory/create-car?token=tok%20en"));
        assert!(url.contains("&limit=5"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_dispatch_error() {
        let transport = MockTransport::returning(503, b"overloaded");
        let service = matched(&[("HTTP-SECURE-JSON", "tok")], &[("http-method", "GET")]);

        let err = dispatcher(transport.clone())
            .send(&service, &HashMap::new(), None)
            .await
            .unwrap_err();

        match err {
            Error::Dispatch { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("expected dispatch error, got {other:?}"),
        }
        assert_eq!(transport.call_count(), 1);
    }
}
