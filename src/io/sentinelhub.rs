//! Sentinel Hub Process API client used to fetch the low-resolution image
//! matching a chip footprint. Blocking HTTP, OAuth2 client credentials,
//! GeoTIFF responses decoded with the `tiff` crate.
use std::io::Cursor;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use ndarray::Array3;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tiff::decoder::{Decoder, DecodingResult};
use tracing::{debug, info, warn};

use crate::core::patch::{BBox, RasterLayer, TimeInterval, ValueRange};
use crate::types::{DataCollection, MosaickingOrder};

/// Largest width/height the Process API accepts for one request.
pub const MAX_OUTPUT_PIXELS: usize = 2500;

const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Errors encountered when talking to Sentinel Hub
#[derive(Debug, Error)]
pub enum SentinelHubError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Missing Sentinel Hub credentials (client id and secret)")]
    MissingCredentials,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Could not decode response: {0}")]
    Decode(String),
}

/// Connection settings. The client secret is never written out.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelHubConfig {
    pub base_url: String,
    pub auth_url: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub timeout_secs: u64,
    /// Total attempts per request; 1 disables retrying.
    pub max_attempts: u32,
}

impl Default for SentinelHubConfig {
    fn default() -> Self {
        Self {
            base_url: "https://services.sentinel-hub.com".to_string(),
            auth_url: "https://services.sentinel-hub.com/auth/realms/main/protocol/openid-connect/token"
                .to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_secs: 120,
            max_attempts: 1,
        }
    }
}

impl std::fmt::Debug for SentinelHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentinelHubConfig")
            .field("base_url", &self.base_url)
            .field("auth_url", &self.auth_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

/// One low-resolution image request for a footprint and time window.
#[derive(Debug, Clone)]
pub struct ImageryRequest {
    /// Tag of the resulting layer, e.g. `TRUE-COLOR-S2-L1C`
    pub layer: String,
    pub collection: DataCollection,
    pub bands: Vec<String>,
    pub bbox: BBox,
    pub time_interval: TimeInterval,
    /// Fraction in 0..=1
    pub max_cloud_coverage: f64,
    pub mosaicking: MosaickingOrder,
    pub width: usize,
    pub height: usize,
}

impl ImageryRequest {
    /// Pixel dimensions covering `bbox` at `resolution_m` metres per pixel.
    pub fn output_size(bbox: &BBox, resolution_m: f64) -> Result<(usize, usize), SentinelHubError> {
        if resolution_m <= 0.0 || !resolution_m.is_finite() {
            return Err(SentinelHubError::InvalidRequest(format!(
                "resolution must be positive, got {resolution_m}"
            )));
        }
        let (w_m, h_m) = bbox.size_meters();
        let width = ((w_m / resolution_m).ceil() as usize).max(1);
        let height = ((h_m / resolution_m).ceil() as usize).max(1);
        if width > MAX_OUTPUT_PIXELS || height > MAX_OUTPUT_PIXELS {
            return Err(SentinelHubError::InvalidRequest(format!(
                "{width}x{height} px exceeds the {MAX_OUTPUT_PIXELS} px limit"
            )));
        }
        Ok((width, height))
    }

    /// Version 3 evalscript returning the requested bands as raw UINT16 DN.
    pub fn evalscript(&self) -> String {
        let quoted: Vec<String> = self.bands.iter().map(|b| format!("\"{b}\"")).collect();
        let samples: Vec<String> = self.bands.iter().map(|b| format!("sample.{b}")).collect();
        format!(
            "//VERSION=3\n\
             function setup() {{\n  \
               return {{\n    \
                 input: [{{ bands: [{}], units: \"DN\" }}],\n    \
                 output: {{ bands: {}, sampleType: \"UINT16\" }}\n  \
               }};\n\
             }}\n\
             function evaluatePixel(sample) {{\n  \
               return [{}];\n\
             }}\n",
            quoted.join(", "),
            self.bands.len(),
            samples.join(", ")
        )
    }

    /// JSON body for `POST /api/v1/process`.
    pub fn to_process_body(&self) -> Value {
        let (from, to) = self.time_interval.to_api_range();
        json!({
            "input": {
                "bounds": {
                    "bbox": [self.bbox.min_x, self.bbox.min_y, self.bbox.max_x, self.bbox.max_y],
                    "properties": { "crs": self.bbox.crs.opengis_url() }
                },
                "data": [{
                    "type": self.collection.as_api_str(),
                    "dataFilter": {
                        "timeRange": { "from": from, "to": to },
                        "maxCloudCoverage": self.max_cloud_coverage * 100.0,
                        "mosaickingOrder": self.mosaicking.as_api_str()
                    }
                }]
            },
            "output": {
                "width": self.width,
                "height": self.height,
                "responses": [{
                    "identifier": "default",
                    "format": { "type": "image/tiff" }
                }]
            },
            "evalscript": self.evalscript()
        })
    }
}

/// Source of the low-resolution layer for a footprint.
pub trait ImageryProvider {
    fn fetch(&self, request: &ImageryRequest) -> Result<RasterLayer, SentinelHubError>;
}

/// Decode a Process API GeoTIFF into a `(rows, cols, bands)` layer.
pub fn decode_tiff_layer(
    bytes: &[u8],
    name: &str,
    expected_bands: usize,
) -> Result<RasterLayer, SentinelHubError> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions()?;
    let (values, range): (Vec<f32>, ValueRange) = match decoder.read_image()? {
        DecodingResult::U8(v) => (v.into_iter().map(f32::from).collect(), ValueRange::U8),
        DecodingResult::U16(v) => (v.into_iter().map(f32::from).collect(), ValueRange::U16),
        DecodingResult::I16(v) => (v.into_iter().map(f32::from).collect(), ValueRange::I16),
        DecodingResult::F32(v) => (v, ValueRange::F32),
        _ => {
            return Err(SentinelHubError::Decode(
                "unsupported sample type in response".into(),
            ));
        }
    };

    let (rows, cols) = (height as usize, width as usize);
    let pixels = rows * cols;
    if pixels == 0 || values.len() % pixels != 0 {
        return Err(SentinelHubError::Decode(format!(
            "{} samples do not tile a {}x{} image",
            values.len(),
            cols,
            rows
        )));
    }
    let bands = values.len() / pixels;
    if bands != expected_bands {
        return Err(SentinelHubError::Decode(format!(
            "expected {expected_bands} bands, response has {bands}"
        )));
    }
    let data = Array3::from_shape_vec((rows, cols, bands), values)
        .map_err(|e| SentinelHubError::Decode(e.to_string()))?;
    RasterLayer::new(name, data, range).map_err(|e| SentinelHubError::Decode(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    valid_until: Instant,
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Blocking Sentinel Hub client with a cached access token.
pub struct SentinelHubClient {
    config: SentinelHubConfig,
    http: Client,
    token: Mutex<Option<CachedToken>>,
}

impl SentinelHubClient {
    pub fn new(config: SentinelHubConfig) -> Result<Self, SentinelHubError> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(SentinelHubError::MissingCredentials);
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("srpair/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            config,
            http,
            token: Mutex::new(None),
        })
    }

    fn access_token(&self) -> Result<String, SentinelHubError> {
        let mut cached = self.token.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.valid_until {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting Sentinel Hub access token");
        let response = self
            .http
            .post(&self.config.auth_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(SentinelHubError::Api {
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }
        let token: TokenResponse = response.json()?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            valid_until: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    fn invalidate_token(&self) {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn process_once(&self, body: &Value) -> Result<Vec<u8>, SentinelHubError> {
        let token = self.access_token()?;
        let url = format!("{}/api/v1/process", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "image/tiff")
            .json(body)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.invalidate_token();
            }
            return Err(SentinelHubError::Api {
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

impl ImageryProvider for SentinelHubClient {
    fn fetch(&self, request: &ImageryRequest) -> Result<RasterLayer, SentinelHubError> {
        let body = request.to_process_body();
        debug!("Process API request: {}", body);
        info!(
            "Fetching {} ({}x{} px) for {:?}",
            request.layer, request.width, request.height, request.bbox
        );

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        let bytes = loop {
            match self.process_once(&body) {
                Ok(bytes) => break bytes,
                Err(e) if attempt < max_attempts && is_retryable(&e) => {
                    let wait = Duration::from_secs(1 << (attempt - 1).min(5));
                    warn!(
                        "Attempt {}/{} failed ({}); retrying in {:?}",
                        attempt, max_attempts, e, wait
                    );
                    std::thread::sleep(wait);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        decode_tiff_layer(&bytes, &request.layer, request.bands.len())
    }
}

fn is_retryable(e: &SentinelHubError) -> bool {
    match e {
        SentinelHubError::Http(err) => err.is_timeout() || err.is_connect(),
        SentinelHubError::Api { status, .. } => StatusCode::from_u16(*status)
            .map(is_retryable_status)
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::patch::Crs;
    use chrono::NaiveDate;
    use tiff::encoder::{TiffEncoder, colortype};

    fn request() -> ImageryRequest {
        ImageryRequest {
            layer: "TRUE-COLOR-S2-L1C".into(),
            collection: DataCollection::Sentinel2L1c,
            bands: vec!["B04".into(), "B03".into(), "B02".into()],
            bbox: BBox::new(-115.3, 36.1, -115.29, 36.11, Crs::WGS84).unwrap(),
            time_interval: TimeInterval::new(
                NaiveDate::from_ymd_opt(2017, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2017, 12, 31).unwrap(),
            )
            .unwrap(),
            max_cloud_coverage: 0.2,
            mosaicking: MosaickingOrder::LeastCc,
            width: 10,
            height: 12,
        }
    }

    #[test]
    fn process_body_carries_filters_and_output() {
        let body = request().to_process_body();
        let data = &body["input"]["data"][0];
        assert_eq!(data["type"], "sentinel-2-l1c");
        assert_eq!(data["dataFilter"]["maxCloudCoverage"], 20.0);

        let mut fine = request();
        fine.max_cloud_coverage = 0.155;
        let body = fine.to_process_body();
        let percent = body["input"]["data"][0]["dataFilter"]["maxCloudCoverage"]
            .as_f64()
            .unwrap();
        assert!((percent - 15.5).abs() < 1e-9);
        assert_eq!(data["dataFilter"]["mosaickingOrder"], "leastCC");
        assert_eq!(data["dataFilter"]["timeRange"]["from"], "2017-01-01T00:00:00Z");
        assert_eq!(data["dataFilter"]["timeRange"]["to"], "2017-12-31T23:59:59Z");
        assert!(body["input"]["bounds"]["properties"]["crs"].as_str().unwrap().ends_with("CRS84"));
        assert_eq!(body["input"]["bounds"]["bbox"][0], -115.3);
        assert_eq!(body["output"]["width"], 10);
        assert_eq!(body["output"]["height"], 12);
        assert_eq!(body["output"]["responses"][0]["format"]["type"], "image/tiff");
    }

    #[test]
    fn evalscript_lists_bands_in_order() {
        let script = request().evalscript();
        assert!(script.starts_with("//VERSION=3"));
        assert!(script.contains("bands: [\"B04\", \"B03\", \"B02\"]"));
        assert!(script.contains("bands: 3, sampleType: \"UINT16\""));
        assert!(script.contains("return [sample.B04, sample.B03, sample.B02];"));
    }

    #[test]
    fn output_size_from_projected_extent() {
        let bbox = BBox::new(0.0, 0.0, 195.0, 100.0, Crs(32611)).unwrap();
        assert_eq!(ImageryRequest::output_size(&bbox, 10.0).unwrap(), (20, 10));
        assert!(ImageryRequest::output_size(&bbox, 0.0).is_err());
        assert!(ImageryRequest::output_size(&bbox, 0.01).is_err());
    }

    #[test]
    fn decodes_rgb16_tiff() {
        let (w, h) = (4u32, 3u32);
        let samples: Vec<u16> = (0..(w * h * 3) as u16).map(|v| v * 100).collect();
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut cursor).unwrap();
            encoder.write_image::<colortype::RGB16>(w, h, &samples).unwrap();
        }
        let layer = decode_tiff_layer(cursor.get_ref(), "TRUE-COLOR-S2-L1C", 3).unwrap();
        assert_eq!((layer.rows(), layer.cols(), layer.bands()), (3, 4, 3));
        assert_eq!(layer.range(), ValueRange::U16);
        assert_eq!(layer.data()[[0, 1, 0]], 300.0);
        assert_eq!(layer.name(), "TRUE-COLOR-S2-L1C");

        assert!(matches!(
            decode_tiff_layer(cursor.get_ref(), "x", 1),
            Err(SentinelHubError::Decode(_))
        ));
    }

    #[test]
    fn garbage_response_is_a_tiff_error() {
        assert!(decode_tiff_layer(b"not a tiff", "x", 3).is_err());
    }

    #[test]
    fn client_requires_credentials() {
        assert!(matches!(
            SentinelHubClient::new(SentinelHubConfig::default()),
            Err(SentinelHubError::MissingCredentials)
        ));
    }

    #[test]
    fn secret_is_not_serialized() {
        let config = SentinelHubConfig {
            client_id: "id".into(),
            client_secret: "hunter2".into(),
            ..Default::default()
        };
        let text = serde_json::to_string(&config).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn retry_only_on_transient_statuses() {
        let api = |status| SentinelHubError::Api {
            status,
            message: String::new(),
        };
        assert!(is_retryable(&api(429)));
        assert!(is_retryable(&api(503)));
        assert!(!is_retryable(&api(400)));
        assert!(!is_retryable(&SentinelHubError::MissingCredentials));
    }

    mod fake_server {
        use super::*;
        use std::collections::VecDeque;
        use std::io::{BufRead, BufReader, Read, Write};
        use std::net::{TcpListener, TcpStream};
        use std::sync::Arc;

        /// What the fake Sentinel Hub saw.
        #[derive(Default)]
        struct Seen {
            token_requests: usize,
            /// `Authorization` header of every process request
            authorizations: Vec<String>,
        }

        struct FakeSentinelHub {
            url: String,
            seen: Arc<Mutex<Seen>>,
        }

        impl FakeSentinelHub {
            /// Serves tokens valid for `expires_in` seconds and answers process
            /// requests with `responses` in order.
            fn start(expires_in: u64, responses: Vec<(u16, Vec<u8>)>) -> Self {
                let listener = TcpListener::bind("127.0.0.1:0").unwrap();
                let url = format!("http://{}", listener.local_addr().unwrap());
                let seen = Arc::new(Mutex::new(Seen::default()));
                let log = seen.clone();
                let mut queue = VecDeque::from(responses);
                std::thread::spawn(move || {
                    for stream in listener.incoming() {
                        let Ok(mut stream) = stream else { continue };
                        let (path, authorization) = read_request(&mut stream);
                        let (status, body) = if path == "/token" {
                            let mut seen = log.lock().unwrap();
                            seen.token_requests += 1;
                            let token = format!(
                                r#"{{"access_token":"tok-{}","expires_in":{}}}"#,
                                seen.token_requests, expires_in
                            );
                            (200, token.into_bytes())
                        } else {
                            log.lock().unwrap().authorizations.push(authorization);
                            queue.pop_front().unwrap_or((500, b"no response left".to_vec()))
                        };
                        let head = format!(
                            "HTTP/1.1 {status} Fake\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                            body.len()
                        );
                        let _ = stream.write_all(head.as_bytes());
                        let _ = stream.write_all(&body);
                        let _ = stream.flush();
                    }
                });
                Self { url, seen }
            }

            fn client(&self, max_attempts: u32) -> SentinelHubClient {
                SentinelHubClient::new(SentinelHubConfig {
                    base_url: self.url.clone(),
                    auth_url: format!("{}/token", self.url),
                    client_id: "id".into(),
                    client_secret: "secret".into(),
                    timeout_secs: 10,
                    max_attempts,
                })
                .unwrap()
            }

            fn token_requests(&self) -> usize {
                self.seen.lock().unwrap().token_requests
            }

            fn authorizations(&self) -> Vec<String> {
                self.seen.lock().unwrap().authorizations.clone()
            }
        }

        /// Request path and `Authorization` header; the body is drained.
        fn read_request(stream: &mut TcpStream) -> (String, String) {
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let path = line.split_whitespace().nth(1).unwrap_or_default().to_string();
            let mut authorization = String::new();
            let mut content_length = 0;
            loop {
                line.clear();
                reader.read_line(&mut line).unwrap();
                let header = line.trim_end();
                if header.is_empty() {
                    break;
                }
                if let Some((name, value)) = header.split_once(':') {
                    match name.to_ascii_lowercase().as_str() {
                        "content-length" => content_length = value.trim().parse().unwrap(),
                        "authorization" => authorization = value.trim().to_string(),
                        _ => {}
                    }
                }
            }
            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).unwrap();
            (path, authorization)
        }

        fn rgb16_tiff() -> Vec<u8> {
            let samples: Vec<u16> = (0..4 * 3 * 3).map(|v| v * 10).collect();
            let mut cursor = Cursor::new(Vec::new());
            {
                let mut encoder = TiffEncoder::new(&mut cursor).unwrap();
                encoder.write_image::<colortype::RGB16>(4, 3, &samples).unwrap();
            }
            cursor.into_inner()
        }

        #[test]
        fn token_is_reused_across_fetches() {
            let server = FakeSentinelHub::start(3600, vec![(200, rgb16_tiff()), (200, rgb16_tiff())]);
            let client = server.client(1);

            let layer = client.fetch(&request()).unwrap();
            assert_eq!((layer.rows(), layer.cols(), layer.bands()), (3, 4, 3));
            client.fetch(&request()).unwrap();

            assert_eq!(server.token_requests(), 1);
            assert_eq!(server.authorizations(), vec!["Bearer tok-1", "Bearer tok-1"]);
        }

        #[test]
        fn token_close_to_expiry_is_refreshed() {
            // 30 s lifetime is inside the 60 s margin
            let server = FakeSentinelHub::start(30, vec![(200, rgb16_tiff()), (200, rgb16_tiff())]);
            let client = server.client(1);
            client.fetch(&request()).unwrap();
            client.fetch(&request()).unwrap();
            assert_eq!(server.token_requests(), 2);
            assert_eq!(server.authorizations(), vec!["Bearer tok-1", "Bearer tok-2"]);
        }

        #[test]
        fn unavailable_service_is_retried() {
            let server = FakeSentinelHub::start(
                3600,
                vec![(503, b"busy".to_vec()), (200, rgb16_tiff())],
            );
            let layer = server.client(2).fetch(&request()).unwrap();
            assert_eq!(layer.range(), ValueRange::U16);
            assert_eq!(server.authorizations().len(), 2);
        }

        #[test]
        fn bad_request_fails_without_retry() {
            let server = FakeSentinelHub::start(3600, vec![(400, b"bbox too large".to_vec())]);
            match server.client(3).fetch(&request()) {
                Err(SentinelHubError::Api { status, message }) => {
                    assert_eq!(status, 400);
                    assert_eq!(message, "bbox too large");
                }
                other => panic!("unexpected result {other:?}"),
            }
            assert_eq!(server.authorizations().len(), 1);
        }

        #[test]
        fn unauthorized_response_drops_cached_token() {
            let server = FakeSentinelHub::start(
                3600,
                vec![(401, b"expired".to_vec()), (200, rgb16_tiff())],
            );
            let client = server.client(1);
            assert!(matches!(
                client.fetch(&request()),
                Err(SentinelHubError::Api { status: 401, .. })
            ));
            client.fetch(&request()).unwrap();
            assert_eq!(server.token_requests(), 2);
            assert_eq!(server.authorizations(), vec!["Bearer tok-1", "Bearer tok-2"]);
        }
    }
}
