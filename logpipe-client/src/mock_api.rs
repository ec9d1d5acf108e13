use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use logpipe_core::api::{
    ApiResult, FetchPageRequest, FetchPageResponse, LogStreamApi, StreamDescription,
    SubmitBatchRequest, SubmitBatchResponse,
};

/// Scripted stand-in for the remote service, recording every request.
///
/// Responses are consumed front-to-back from the scripted queues; when a
/// queue runs dry the call succeeds with a benign empty result, so
/// background loops keep ticking harmlessly.
#[derive(Default)]
pub(crate) struct MockApi {
    create_results: Mutex<VecDeque<ApiResult<()>>>,
    describe_results: Mutex<VecDeque<ApiResult<Vec<StreamDescription>>>>,
    submit_results: Mutex<VecDeque<ApiResult<SubmitBatchResponse>>>,
    fetch_results: Mutex<VecDeque<ApiResult<FetchPageResponse>>>,

    creates: Mutex<Vec<(String, String)>>,
    describes: Mutex<Vec<(String, String)>>,
    submits: Mutex<Vec<SubmitBatchRequest>>,
    fetches: Mutex<Vec<FetchPageRequest>>,
}

impl MockApi {
    pub(crate) fn new() -> Self {
        MockApi::default()
    }

    pub(crate) fn on_create(&self, result: ApiResult<()>) {
        self.create_results.lock().unwrap().push_back(result);
    }

    pub(crate) fn on_describe(&self, result: ApiResult<Vec<StreamDescription>>) {
        self.describe_results.lock().unwrap().push_back(result);
    }

    pub(crate) fn on_submit(&self, result: ApiResult<SubmitBatchResponse>) {
        self.submit_results.lock().unwrap().push_back(result);
    }

    pub(crate) fn on_fetch(&self, result: ApiResult<FetchPageResponse>) {
        self.fetch_results.lock().unwrap().push_back(result);
    }

    pub(crate) fn creates(&self) -> Vec<(String, String)> {
        self.creates.lock().unwrap().clone()
    }

    pub(crate) fn describes(&self) -> Vec<(String, String)> {
        self.describes.lock().unwrap().clone()
    }

    pub(crate) fn submits(&self) -> Vec<SubmitBatchRequest> {
        self.submits.lock().unwrap().clone()
    }

    pub(crate) fn fetches(&self) -> Vec<FetchPageRequest> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogStreamApi for MockApi {
    async fn create_stream(&self, group_name: &str, stream_name: &str) -> ApiResult<()> {
        self.creates
            .lock()
            .unwrap()
            .push((group_name.to_string(), stream_name.to_string()));
        self.create_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn describe_streams(
        &self,
        group_name: &str,
        stream_prefix: &str,
    ) -> ApiResult<Vec<StreamDescription>> {
        self.describes
            .lock()
            .unwrap()
            .push((group_name.to_string(), stream_prefix.to_string()));
        self.describe_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Vec::new()))
    }

    async fn submit_batch(&self, request: SubmitBatchRequest) -> ApiResult<SubmitBatchResponse> {
        self.submits.lock().unwrap().push(request);
        self.submit_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SubmitBatchResponse::default()))
    }

    async fn fetch_page(&self, request: FetchPageRequest) -> ApiResult<FetchPageResponse> {
        self.fetches.lock().unwrap().push(request);
        self.fetch_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(FetchPageResponse::default()))
    }
}
