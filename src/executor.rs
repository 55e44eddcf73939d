//! HTTP transport for key requests

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use bytes::Bytes;
use http::HeaderMap;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HttpClient;
use hyper_util::rt::TokioExecutor;
use tracing::debug;
use url::form_urlencoded;

use crate::client::ClientConfig;
use crate::error::{Error, Result};
use crate::request::{KeyRequest, Params};

/// Status, headers and body of a store response, before interpretation
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Full response body
    pub body: Bytes,
}

impl RawResponse {
    /// Response with the given status and body and no headers
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Sends one request and waits for one response.
///
/// Implementations report network failures and timeouts as errors and hand back every
/// response the store produced, whatever its status.
pub trait Executor: Send + Sync {
    /// Execute a shaped request
    fn execute(&self, request: KeyRequest) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// Parse a hex fingerprint string (with or without colons) into 32 bytes.
fn parse_fingerprint(s: &str) -> Result<[u8; 32]> {
    let hex_str: String = s.chars().filter(|c| *c != ':').collect();
    let bytes = hex::decode(&hex_str)
        .map_err(|e| Error::Tls(format!("Invalid SSL fingerprint hex: {}", e)))?;
    if bytes.len() != 32 {
        return Err(Error::Tls(format!(
            "SSL fingerprint must be 32 bytes (SHA-256), got {} bytes",
            bytes.len()
        )));
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

/// Custom certificate check: with `pinned`, only a certificate whose SHA-256 digest
/// matches is accepted; without, any certificate is.
struct CertVerifier {
    pinned: Option<[u8; 32]>,
    provider: Arc<rustls::crypto::CryptoProvider>,
}

impl fmt::Debug for CertVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertVerifier")
            .field("pinned", &self.pinned.map(hex::encode))
            .finish()
    }
}

impl rustls::client::danger::ServerCertVerifier for CertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        let Some(expected) = &self.pinned else {
            return Ok(rustls::client::danger::ServerCertVerified::assertion());
        };
        let fingerprint = ring::digest::digest(&ring::digest::SHA256, end_entity.as_ref());
        if fingerprint.as_ref() == expected {
            Ok(rustls::client::danger::ServerCertVerified::assertion())
        } else {
            Err(rustls::Error::General(format!(
                "Certificate fingerprint mismatch: expected {}, got {}",
                hex::encode(expected),
                hex::encode(fingerprint.as_ref())
            )))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &rustls::pki_types::CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &rustls::pki_types::CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Build a rustls ClientConfig. Fingerprint pinning wins over `reject_unauthorized=false`,
/// which wins over standard CA verification.
fn build_tls_config(
    ssl_fingerprint: Option<&str>,
    reject_unauthorized: bool,
) -> Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(e.to_string()))?;

    let pinned = ssl_fingerprint.map(parse_fingerprint).transpose()?;
    if pinned.is_some() || !reject_unauthorized {
        let verifier = Arc::new(CertVerifier { pinned, provider });
        return Ok(builder
            .dangerous()
            .with_custom_certificate_verifier(verifier)
            .with_no_client_auth());
    }

    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    Ok(builder.with_root_certificates(roots).with_no_client_auth())
}

/// Encode wire fields as `application/x-www-form-urlencoded`
pub(crate) fn encode_params(params: &Params) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
        .finish()
}

/// Whether the method carries its fields in the query string rather than the body
fn fields_in_query(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::DELETE | Method::HEAD)
}

type HttpsConnector = hyper_rustls::HttpsConnector<HttpConnector>;

/// Pooled hyper client speaking HTTP/1.1 or HTTP/2, in plaintext or over TLS
#[derive(Clone)]
pub struct HttpExecutor {
    endpoint: Arc<str>,
    authorization: Option<Arc<str>>,
    read_timeout: Duration,
    http_client: HttpClient<HttpsConnector, Full<Bytes>>,
}

impl fmt::Debug for HttpExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpExecutor")
            .field("endpoint", &self.endpoint)
            .field("authorization", &self.authorization.as_ref().map(|_| "<redacted>"))
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl HttpExecutor {
    /// Build a transport for the given configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let _: Uri = config
            .endpoint
            .parse()
            .map_err(|e| Error::InvalidUrl(format!("Invalid endpoint URL: {}", e)))?;

        if config.ssl_fingerprint.is_some() && !config.endpoint.starts_with("https://") {
            return Err(Error::Tls(
                "ssl_fingerprint requires an https:// endpoint".to_string(),
            ));
        }

        let authorization = match (&config.username, &config.password) {
            (Some(user), password) => {
                let credentials = format!("{}:{}", user, password.as_deref().unwrap_or(""));
                let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
                Some(Arc::from(format!("Basic {}", encoded)))
            }
            (None, Some(_)) => {
                return Err(Error::InvalidArgument(
                    "password given without a username".to_string(),
                ))
            }
            (None, None) => None,
        };

        let tls_config =
            build_tls_config(config.ssl_fingerprint.as_deref(), config.reject_unauthorized)?;

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let http_client = HttpClient::builder(TokioExecutor::new())
            .http2_only(config.http2_only)
            .build(https_connector);

        Ok(Self {
            endpoint: Arc::from(config.endpoint.trim_end_matches('/')),
            authorization,
            read_timeout: config.read_timeout(),
            http_client,
        })
    }

    async fn send(&self, request: KeyRequest) -> Result<RawResponse> {
        let KeyRequest {
            method,
            path,
            params,
            timeout,
        } = request;

        let encoded = encode_params(&params);
        let in_query = fields_in_query(&method);
        let url = if in_query && !encoded.is_empty() {
            format!("{}{}?{}", self.endpoint, path, encoded)
        } else {
            format!("{}{}", self.endpoint, path)
        };
        let uri: Uri = url
            .parse()
            .map_err(|e| Error::InvalidUrl(format!("Invalid request URL: {}", e)))?;

        let mut builder = Request::builder().method(method.clone()).uri(uri);
        if let Some(authorization) = &self.authorization {
            builder = builder.header("authorization", authorization.as_ref());
        }

        let req = if in_query {
            builder.body(Full::new(Bytes::new()))
        } else {
            builder
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Full::new(Bytes::from(encoded)))
        };
        let req = req.map_err(|e| Error::InvalidRequest(format!("Failed to build request: {}", e)))?;

        let field_names: Vec<&str> = params.iter().map(|(k, _)| *k).collect();
        debug!("Sending request: {} {} fields={:?}", method, path, field_names);

        let timeout = timeout.unwrap_or(self.read_timeout);
        let timeout_ms = timeout.as_millis() as u64;
        let response = tokio::time::timeout(timeout, async {
            let response = self
                .http_client
                .request(req)
                .await
                .map_err(|e| Error::Connection(format!("Request failed: {}", e)))?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = read_body_to_bytes(response.into_body()).await?;
            Ok::<_, Error>(RawResponse {
                status,
                headers,
                body,
            })
        })
        .await
        .map_err(|_| Error::Timeout(timeout_ms))??;

        debug!("Response: {} {} -> {}", method, path, response.status);
        Ok(response)
    }
}

impl Executor for HttpExecutor {
    fn execute(&self, request: KeyRequest) -> impl Future<Output = Result<RawResponse>> + Send {
        self.send(request)
    }
}

/// Read response body to bytes
async fn read_body_to_bytes(body: Incoming) -> Result<Bytes> {
    let collected = body
        .collect()
        .await
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    Ok(collected.to_bytes())
}
