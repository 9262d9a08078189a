//! Request body transcoding.
//!
//! The inbound body is decoded according to its declared content type and
//! re-encoded in the same family for the outbound call:
//!
//! ```text
//! GET/HEAD/OPTIONS/...          → Empty      (body never read)
//! application/json, */*+json    → Json       (parse, re-serialize; invalid → absent)
//! x-www-form-urlencoded         → FormUrlEncoded (pairs, re-encoded)
//! multipart/form-data           → Multipart  (parts re-framed, bytes untouched)
//! anything else / missing       → RawText    (bytes passed through)
//! ```
//!
//! Transcoding failures never fail the request: the body is forwarded as
//! absent and the failure is logged.

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart},
    http::{header, HeaderMap, Method, Request},
};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::observability::metrics;

/// How a request body is interpreted and re-emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Json,
    FormUrlEncoded,
    Multipart,
    RawText,
    Empty,
}

impl BodyEncoding {
    /// Classify from the method and the declared `Content-Type`.
    pub fn classify(method: &Method, content_type: Option<&str>) -> Self {
        if !carries_body(method) {
            return Self::Empty;
        }
        let Some(content_type) = content_type else {
            return Self::RawText;
        };
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/json" => Self::Json,
            "application/x-www-form-urlencoded" => Self::FormUrlEncoded,
            "multipart/form-data" => Self::Multipart,
            s if s.ends_with("+json") => Self::Json,
            _ => Self::RawText,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::FormUrlEncoded => "form",
            Self::Multipart => "multipart",
            Self::RawText => "raw",
            Self::Empty => "empty",
        }
    }
}

/// Methods whose body is forwarded.
pub fn carries_body(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// The body sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundBody {
    Absent,
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart(Vec<MultipartPart>),
    Raw(Bytes),
}

impl OutboundBody {
    /// Adjust sanitized headers for this body.
    ///
    /// Multipart is re-framed with a new boundary, so the caller's
    /// `Content-Type` no longer describes it.
    pub fn prepare_headers(&self, headers: &mut HeaderMap) {
        if let OutboundBody::Multipart(_) = self {
            headers.remove(header::CONTENT_TYPE);
        }
    }

    /// Attach the body to an outbound request.
    pub fn attach(self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            OutboundBody::Absent => builder,
            OutboundBody::Json(value) => builder.json(&value),
            OutboundBody::Form(pairs) => builder.body(encode_form(&pairs)),
            OutboundBody::Multipart(parts) => builder.multipart(build_form(parts)),
            OutboundBody::Raw(bytes) => builder.body(bytes),
        }
    }
}

/// Read and transcode the body of `request`.
///
/// The request is consumed so the multipart extractor sees the body limit
/// configured on the router.
pub async fn transcode(request: Request<Body>, limit: usize) -> (BodyEncoding, OutboundBody) {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let encoding = BodyEncoding::classify(request.method(), content_type.as_deref());

    let body = match encoding {
        BodyEncoding::Empty => OutboundBody::Absent,
        BodyEncoding::Multipart => read_multipart(request).await,
        BodyEncoding::Json => match read_bytes(request, limit, encoding).await {
            Some(bytes) => decode_json(&bytes),
            None => OutboundBody::Absent,
        },
        BodyEncoding::FormUrlEncoded => match read_bytes(request, limit, encoding).await {
            Some(bytes) => OutboundBody::Form(decode_form(&bytes)),
            None => OutboundBody::Absent,
        },
        BodyEncoding::RawText => match read_bytes(request, limit, encoding).await {
            Some(bytes) => OutboundBody::Raw(bytes),
            None => OutboundBody::Absent,
        },
    };

    (encoding, body)
}

async fn read_bytes(request: Request<Body>, limit: usize, encoding: BodyEncoding) -> Option<Bytes> {
    match axum::body::to_bytes(request.into_body(), limit).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!(encoding = encoding.as_str(), error = %e, "Failed to read request body, forwarding without body");
            metrics::record_transcode_failure(encoding.as_str());
            None
        }
    }
}

/// Parse JSON leniently: malformed input becomes an absent body.
pub fn decode_json(bytes: &[u8]) -> OutboundBody {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => OutboundBody::Json(value),
        Err(e) => {
            if !bytes.is_empty() {
                tracing::warn!(error = %e, "Request body is not valid JSON, forwarding without body");
                metrics::record_transcode_failure(BodyEncoding::Json.as_str());
            }
            OutboundBody::Absent
        }
    }
}

pub fn decode_form(bytes: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(bytes).into_owned().collect()
}

pub fn encode_form(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

async fn read_multipart(request: Request<Body>) -> OutboundBody {
    let mut multipart = match Multipart::from_request(request, &()).await {
        Ok(multipart) => multipart,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed multipart request, forwarding without body");
            metrics::record_transcode_failure(BodyEncoding::Multipart.as_str());
            return OutboundBody::Absent;
        }
    };

    let mut parts = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, parts_read = parts.len(), "Failed to read multipart field, forwarding without body");
                metrics::record_transcode_failure(BodyEncoding::Multipart.as_str());
                return OutboundBody::Absent;
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        match field.bytes().await {
            Ok(data) => parts.push(MultipartPart {
                name,
                file_name,
                content_type,
                data,
            }),
            Err(e) => {
                tracing::warn!(field = %name, error = %e, "Failed to read multipart field, forwarding without body");
                metrics::record_transcode_failure(BodyEncoding::Multipart.as_str());
                return OutboundBody::Absent;
            }
        }
    }

    OutboundBody::Multipart(parts)
}

fn build_form(parts: Vec<MultipartPart>) -> Form {
    parts.into_iter().fold(Form::new(), |form, part| {
        let name = part.name.clone();
        form.part(name, to_part(part))
    })
}

fn to_part(part: MultipartPart) -> Part {
    let build = |part: &MultipartPart| {
        let out = Part::bytes(part.data.to_vec());
        match &part.file_name {
            Some(file_name) => out.file_name(file_name.clone()),
            None => out,
        }
    };

    match &part.content_type {
        Some(content_type) => build(&part).mime_str(content_type).unwrap_or_else(|e| {
            tracing::warn!(field = %part.name, content_type = %content_type, error = %e, "Dropping unparseable part content type");
            build(&part)
        }),
        None => build(&part),
    }
}
