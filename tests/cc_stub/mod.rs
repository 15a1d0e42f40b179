use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// What the stubbed Creative Commons endpoint sends back.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum CcBehavior {
    /// A well-formed attribution document echoing creator and title,
    /// versioned 4.0 the way the real endpoint answers.
    Attribution,
    /// Invalid XML, for the degraded-parse path.
    MalformedXml,
}

pub struct CcStub {
    pub base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CcStub {
    pub fn spawn(behavior: CcBehavior) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start cc stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/rest/1.5/");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let raw_url = request.url().to_string();
                let (path, query) = raw_url.split_once('?').unwrap_or((raw_url.as_str(), ""));
                if request.method() != &tiny_http::Method::Get
                    || !path.starts_with("/rest/1.5/license/")
                    || !path.ends_with("/get")
                {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }

                let params: HashMap<String, String> =
                    url::form_urlencoded::parse(query.as_bytes())
                        .into_owned()
                        .collect();

                let body = match behavior {
                    CcBehavior::Attribution => attribution_body(&params),
                    CcBehavior::MalformedXml => "<result><html>broken</p>".to_owned(),
                };

                let header = tiny_http::Header::from_bytes(
                    &b"Content-Type"[..],
                    &b"text/xml; charset=utf-8"[..],
                )
                .expect("build header");
                let response = tiny_http::Response::from_string(body)
                    .with_status_code(200)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for CcStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn attribution_body(params: &HashMap<String, String>) -> String {
    let empty = String::new();
    let creator = params.get("creator").unwrap_or(&empty);
    let title = params.get("title").unwrap_or(&empty);

    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?><result>\
         <html><p xmlns:dct=\"http://purl.org/dc/terms/\">\
         <a rel=\"license\" href=\"http://creativecommons.org/licenses/by/4.0/\">\
         <img src=\"http://i.creativecommons.org/l/by/4.0/88x31.png\"/></a> \
         {title} by {creator} is licensed under a Creative Commons Attribution 4.0 \
         International License.</p></html></result>"
    )
}
