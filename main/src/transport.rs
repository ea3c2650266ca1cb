use crate::soap;
use crate::soap::SoapError;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use mockall::automock;
use reqwest::Client;

#[automock]
pub trait SoapClient {
    fn call(&self, url: String, envelope: String) -> BoxFuture<'static, Result<String, SoapError>>;
}

/// Posts SOAP envelopes over plain HTTP, the transport ONVIF devices expose
/// by default. Timeouts are whatever the HTTP client defaults to; none are
/// imposed here.
#[derive(Default)]
pub struct HttpSoapClient {
    http: Client,
}

impl SoapClient for HttpSoapClient {
    fn call(&self, url: String, envelope: String) -> BoxFuture<'static, Result<String, SoapError>> {
        let http = self.http.clone();
        async move {
            log::debug!("SOAP request of {} byte(s) to {}", envelope.len(), url);
            let response = http
                .post(&url)
                .header("Content-Type", "application/soap+xml; charset=utf-8")
                .body(envelope)
                .send()
                .await?;
            let status = response.status();
            let text = response.text().await?;

            // Faults first: devices report them with a 400 or 500 status,
            // and the fault reason beats a bare status code.
            if let Some(reason) = soap::fault_reason(&text) {
                return Err(SoapError::Fault(reason));
            }
            if !status.is_success() {
                return Err(SoapError::Status(status.as_u16()));
            }
            Ok(text)
        }
        .boxed()
    }
}
