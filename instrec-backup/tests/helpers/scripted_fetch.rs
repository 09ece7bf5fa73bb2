//! Scripted `HttpFetch`: fixed responses per URL, 404 for anything else

use std::collections::HashMap;
use std::sync::Mutex;

use futures::stream::{self, StreamExt};
use instrec_backup::transfer::{FetchError, FetchResponse, HttpFetch};

#[derive(Debug, Clone)]
enum Scripted {
    Body { status: u16, chunks: Vec<Vec<u8>> },
    /// Sends the first chunk, then the connection drops
    Truncated { first: Vec<u8> },
    Unreachable,
}

#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, Scripted>>,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, body: &[u8]) {
        self.respond(url, 200, vec![body.to_vec()]);
    }

    pub fn respond(&self, url: &str, status: u16, chunks: Vec<Vec<u8>>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Body { status, chunks });
    }

    pub fn truncate(&self, url: &str, first: &[u8]) {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            Scripted::Truncated {
                first: first.to_vec(),
            },
        );
    }

    pub fn unreachable(&self, url: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Unreachable);
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl HttpFetch for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.fetched.lock().unwrap().push(url.to_string());
        let scripted = self.responses.lock().unwrap().get(url).cloned();

        match scripted {
            Some(Scripted::Body { status, chunks }) => Ok(FetchResponse {
                status,
                body: stream::iter(chunks.into_iter().map(Ok)).boxed(),
            }),
            Some(Scripted::Truncated { first }) => Ok(FetchResponse {
                status: 200,
                body: stream::iter(vec![
                    Ok(first),
                    Err(FetchError::Network("connection closed mid-body".into())),
                ])
                .boxed(),
            }),
            Some(Scripted::Unreachable) => Err(FetchError::Network(format!("cannot reach {}", url))),
            None => Ok(FetchResponse {
                status: 404,
                body: stream::empty().boxed(),
            }),
        }
    }
}
