use super::wire::{canonical_header_name, insert_header};
use super::{HttpResponse, HttpService};
use crate::error::HostError;
use reqwest::blocking::Client;
use std::collections::BTreeMap;
use tracing::debug;

impl HttpService {
    /// Issue one synchronous request and buffer the whole response.
    ///
    /// A fresh client is built per call, so nothing is pooled between
    /// requests. Any status code is a successful result; only transport and
    /// protocol failures are errors.
    pub fn request(
        &self,
        method: &str,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: Option<&[u8]>,
    ) -> Result<HttpResponse, HostError> {
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|_| {
                HostError::InvalidArgument(format!("invalid http method '{}'", method))
            })?;
        let url = reqwest::Url::parse(url)
            .map_err(|e| HostError::InvalidArgument(format!("invalid url '{}': {}", url, e)))?;

        let mut builder = Client::builder().timeout(self.client_timeout);
        if !self.proxy_from_env {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| HostError::Http(format!("cannot build client: {}", e)))?;

        let mut req = client.request(method.clone(), url.clone());
        for (name, value) in headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            req = req.body(body.to_vec());
        }

        let response = req.send().map_err(|e| HostError::Http(e.to_string()))?;
        let status = response.status().as_u16();

        let mut out_headers = BTreeMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes());
            insert_header(&mut out_headers, &canonical_header_name(name.as_str()), &value);
        }

        let body = response
            .bytes()
            .map_err(|e| HostError::Http(format!("reading response body: {}", e)))?
            .to_vec();

        debug!(%method, %url, status, bytes = body.len(), "http request completed");
        Ok(HttpResponse {
            status,
            headers: out_headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use std::net::TcpListener;

    #[test]
    fn bad_method_and_url_are_contract_errors() {
        let http = HttpService::default();
        let headers = BTreeMap::new();
        assert!(matches!(
            http.request("GE T", "http://127.0.0.1/", &headers, None),
            Err(HostError::InvalidArgument(_))
        ));
        assert!(matches!(
            http.request("GET", "not a url", &headers, None),
            Err(HostError::InvalidArgument(_))
        ));
    }

    #[test]
    fn refused_connection_is_a_transport_error() {
        // Grab a free port, then release it so nothing is listening there.
        let port = {
            let probe = TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };
        let http = HttpService::new(&HttpConfig {
            proxy_from_env: false,
            ..HttpConfig::default()
        });
        let err = http
            .request(
                "GET",
                &format!("http://127.0.0.1:{}/", port),
                &BTreeMap::new(),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, HostError::Http(_)));
    }
}
