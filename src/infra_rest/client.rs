use crate::application_port::*;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::time::Duration;
use url::Url;

const APIKEY: &str = "apikey";
const PREFER: &str = "prefer";
const X_UPSERT: &str = "x-upsert";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

const RETURN_ROWS: &str = "return=representation";
const RETURN_NOTHING: &str = "return=minimal";
const MERGE_ROWS: &str = "resolution=merge-duplicates,return=representation";
const MERGE_NOTHING: &str = "resolution=merge-duplicates,return=minimal";

#[derive(Clone)]
pub struct GatewayConfig {
    pub url: String,
    pub api_key: String,
    pub access_token: Option<String>,
    pub timeout: Duration,
}

/// HTTP handle on the hosted gateway: tables and RPC under `rest/v1`, objects
/// under `storage/v1`, realtime under `realtime/v1`.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
    bearer: String,
}

impl RestClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut base = Url::parse(&config.url)
            .map_err(|e| GatewayError::Transport(format!("invalid gateway url: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("build http client: {e}")))?;

        Ok(Self {
            http,
            base,
            api_key: config.api_key.clone(),
            bearer: config
                .access_token
                .clone()
                .unwrap_or_else(|| config.api_key.clone()),
        })
    }

    pub fn from(&self, table: &str) -> TableRequest<'_> {
        TableRequest {
            client: self,
            table: table.to_owned(),
            params: Vec::new(),
            single: false,
        }
    }

    pub fn bearer(&self) -> &str {
        &self.bearer
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base
            .join(path)
            .map_err(|e| GatewayError::Transport(format!("invalid endpoint {path}: {e}")))
    }

    fn auth_headers(&self) -> Result<HeaderMap, GatewayError> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| GatewayError::Transport(format!("invalid api key header: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.bearer))
            .map_err(|e| GatewayError::Transport(format!("invalid auth header: {e}")))?;
        headers.insert(HeaderName::from_static(APIKEY), api_key);
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, GatewayError> {
        Ok(self.http.request(method, url).headers(self.auth_headers()?))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, GatewayError> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(format!("read response body: {e}")))?;

        if status.is_success() {
            Ok(body.to_vec())
        } else {
            Err(ApiFault::from_body(status.as_u16(), &body).into())
        }
    }

    pub async fn rpc<A, T>(&self, function: &str, args: &A) -> Result<T, GatewayError>
    where
        A: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&format!("rest/v1/rpc/{function}"))?;
        tracing::trace!("rpc {function}");
        let body = self.send(self.request(Method::POST, url)?.json(args)).await?;
        decode(&body)
    }

    pub async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(&format!("storage/v1/object/{bucket}/{path}"))?;
        let request = self
            .request(Method::POST, url)?
            .header(CONTENT_TYPE, content_type)
            .header(X_UPSERT, "false")
            .header("cache-control", "max-age=3600")
            .body(bytes);
        self.send(request).await?;
        Ok(())
    }

    pub fn public_object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}storage/v1/object/public/{bucket}/{path}", self.base)
    }

    pub fn realtime_url(&self) -> Result<Url, GatewayError> {
        let mut url = self.endpoint("realtime/v1/websocket")?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| GatewayError::Transport(format!("cannot use {scheme} for {url}")))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.api_key)
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }
}

/// One PostgREST request against a table. Filters accumulate as query
/// parameters; the terminal method picks the verb.
pub struct TableRequest<'a> {
    client: &'a RestClient,
    table: String,
    params: Vec<(String, String)>,
    single: bool,
}

impl<'a> TableRequest<'a> {
    fn param(mut self, key: &str, value: String) -> Self {
        self.params.push((key.to_owned(), value));
        self
    }

    pub fn select(self, columns: &str) -> Self {
        self.param("select", columns.to_owned())
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("eq.{value}"))
    }

    pub fn in_list<V: Display>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let joined = values
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.param(column, format!("in.({joined})"))
    }

    /// `expr` is a comma separated list of `column.op.value` alternatives.
    pub fn or(self, expr: &str) -> Self {
        self.param("or", format!("({expr})"))
    }

    /// e.g. `created_at.asc` or `last_message_at.desc.nullslast`
    pub fn order(self, ordering: &str) -> Self {
        self.param("order", ordering.to_owned())
    }

    pub fn on_conflict(self, columns: &str) -> Self {
        self.param("on_conflict", columns.to_owned())
    }

    /// Expect exactly one row; zero rows surfaces as a `PGRST116` rejection.
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn url(&self) -> Result<Url, GatewayError> {
        let mut url = self.client.endpoint(&format!("rest/v1/{}", self.table))?;
        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn build(&self, method: Method, prefer: Option<&str>) -> Result<RequestBuilder, GatewayError> {
        let mut request = self.client.request(method, self.url()?)?;
        if self.single {
            request = request.header(ACCEPT, SINGLE_OBJECT);
        }
        if let Some(prefer) = prefer {
            request = request.header(PREFER, prefer);
        }
        Ok(request)
    }

    pub async fn fetch<T: DeserializeOwned>(self) -> Result<T, GatewayError> {
        let body = self.client.send(self.build(Method::GET, None)?).await?;
        decode(&body)
    }

    pub async fn insert<B, T>(self, rows: &B) -> Result<T, GatewayError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.build(Method::POST, Some(RETURN_ROWS))?.json(rows);
        let body = self.client.send(request).await?;
        decode(&body)
    }

    pub async fn upsert<B, T>(self, rows: &B) -> Result<T, GatewayError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.build(Method::POST, Some(MERGE_ROWS))?.json(rows);
        let body = self.client.send(request).await?;
        decode(&body)
    }

    pub async fn upsert_quietly<B>(self, rows: &B) -> Result<(), GatewayError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let request = self.build(Method::POST, Some(MERGE_NOTHING))?.json(rows);
        self.client.send(request).await?;
        Ok(())
    }

    pub async fn update<B, T>(self, patch: &B) -> Result<T, GatewayError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.build(Method::PATCH, Some(RETURN_ROWS))?.json(patch);
        let body = self.client.send(request).await?;
        decode(&body)
    }

    pub async fn update_quietly<B>(self, patch: &B) -> Result<(), GatewayError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let request = self.build(Method::PATCH, Some(RETURN_NOTHING))?.json(patch);
        self.client.send(request).await?;
        Ok(())
    }
}

pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(body).map_err(|e| GatewayError::Decode(e.to_string()))
}
