use std::env;

use framekit_core::Record;
use tracing::{info, warn};

use crate::client::HubClient;
use crate::error::HubError;
use crate::rows::{
    RowsResponse, SplitEntry, SplitsResponse, asset_field, media_columns, plan_row, resolve_config,
};

pub const DEFAULT_ENDPOINT: &str = "https://datasets-server.huggingface.co";

/// The datasets-server caps a single `/rows` request at this many rows.
pub const MAX_PAGE_SIZE: usize = 100;

/// Connection settings for the dataset hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    pub endpoint: String,
    pub token: Option<String>,
    pub proxy: Option<String>,
    pub page_size: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            token: None,
            proxy: None,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

impl HubConfig {
    /// Defaults plus the token from `HF_TOKEN` / `HUGGING_FACE_HUB_TOKEN` and
    /// the proxy from `HTTPS_PROXY` / `HTTP_PROXY`.
    pub fn from_env() -> Self {
        let token = env::var("HF_TOKEN")
            .ok()
            .or_else(|| env::var("HUGGING_FACE_HUB_TOKEN").ok())
            .filter(|t| !t.trim().is_empty());
        let proxy = env::var("HTTPS_PROXY")
            .ok()
            .or_else(|| env::var("HTTP_PROXY").ok());

        Self {
            token,
            proxy,
            ..Self::default()
        }
    }

    pub fn set_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn set_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Rows per request, clamped to `1..=100`.
    pub fn set_page_size(mut self, size: usize) -> Self {
        self.page_size = size.clamp(1, MAX_PAGE_SIZE);
        self
    }
}

/// Top-level builder for hub access.
///
/// # Example
/// ```rust,no_run
/// # async fn run() -> Result<(), framekit_hub::HubError> {
/// use framekit_hub::{HubApi, HubConfig};
/// let api = HubApi::new(HubConfig::from_env())?;
/// let split = api
///     .dataset("video-think-bench/VideoThinkBench")
///     .split("test")
///     .await?;
/// let mut pager = split.pages(Some(10));
/// while let Some(page) = pager.next_page().await? {
///     println!("{} records at offset {}", page.records.len(), page.offset);
/// }
/// # Ok(())
/// # }
/// ```
pub struct HubApi {
    client: HubClient,
    page_size: usize,
}

/// Builder stage after `.dataset()` has been called.
pub struct DatasetApi<'a> {
    api: &'a HubApi,
    repo: String,
}

/// A resolved `(dataset, config, split)` triple.
pub struct SplitApi<'a> {
    api: &'a HubApi,
    entry: SplitEntry,
}

impl HubApi {
    /// Fails when the endpoint is not a valid URL or the HTTP client cannot
    /// be built.
    pub fn new(config: HubConfig) -> Result<Self, HubError> {
        let client = HubClient::new(&config.endpoint, config.token, config.proxy.as_deref())?;
        Ok(Self {
            client,
            page_size: config.page_size.clamp(1, MAX_PAGE_SIZE),
        })
    }

    pub fn dataset(&self, repo: impl Into<String>) -> DatasetApi<'_> {
        DatasetApi {
            api: self,
            repo: repo.into(),
        }
    }
}

impl<'a> DatasetApi<'a> {
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Every `(config, split)` pair the dataset exposes.
    pub async fn splits(&self) -> Result<Vec<SplitEntry>, HubError> {
        let url = self
            .api
            .client
            .url("splits", &[("dataset", self.repo.clone())])?;
        let resp: SplitsResponse = self.api.client.get_json(url, &self.repo).await?;
        Ok(resp.splits)
    }

    /// Resolve `split` to the config that contains it.
    pub async fn split(self, split: &str) -> Result<SplitApi<'a>, HubError> {
        let splits = self.splits().await?;
        let entry = resolve_config(&splits, split)
            .cloned()
            .ok_or_else(|| HubError::SplitNotFound {
                repo: self.repo.clone(),
                split: split.to_owned(),
                available: splits.iter().map(|s| s.split.clone()).collect(),
            })?;
        info!(
            repo = %self.repo,
            config = %entry.config,
            split = %entry.split,
            "resolved dataset split"
        );
        Ok(SplitApi {
            api: self.api,
            entry,
        })
    }
}

/// One fetched page of records.
#[derive(Debug)]
pub struct RowsPage {
    /// Index of the first record within the split.
    pub offset: usize,
    pub records: Vec<Record>,
    /// Rows in the whole split.
    pub total: usize,
}

impl<'a> SplitApi<'a> {
    pub fn entry(&self) -> &SplitEntry {
        &self.entry
    }

    /// Fetch `length` rows starting at `offset`, downloading media cells.
    ///
    /// A media cell that fails to download is left as
    /// [`Field::Null`](framekit_core::Field::Null); the adapter then skips
    /// that record.
    pub async fn fetch_page(&self, offset: usize, length: usize) -> Result<RowsPage, HubError> {
        let client = &self.api.client;
        let url = client.url(
            "rows",
            &[
                ("dataset", self.entry.dataset.clone()),
                ("config", self.entry.config.clone()),
                ("split", self.entry.split.clone()),
                ("offset", offset.to_string()),
                ("length", length.clamp(1, MAX_PAGE_SIZE).to_string()),
            ],
        )?;
        let resp: RowsResponse = client.get_json(url, &self.entry.dataset).await?;
        let media = media_columns(&resp.features);

        let mut records = Vec::with_capacity(resp.rows.len());
        for row in resp.rows {
            let (mut record, pending) = plan_row(row.row, &media);
            for asset in pending {
                let fetched = client.fetch_asset(&asset.url).await;
                if let Err(e) = &fetched {
                    warn!(
                        row = row.row_idx,
                        column = %asset.column,
                        error = %e,
                        "asset download failed"
                    );
                }
                let field = asset_field(&asset, fetched);
                record.insert(asset.column, field);
            }
            records.push(record);
        }

        Ok(RowsPage {
            offset,
            records,
            total: resp.num_rows_total,
        })
    }

    /// Page through the split, stopping after `limit` records when given.
    pub fn pages(&self, limit: Option<usize>) -> RowPager<'_, 'a> {
        RowPager {
            split: self,
            offset: 0,
            limit,
            total: None,
        }
    }

    /// Collect up to `limit` records into memory. Prefer [`Self::pages`] for
    /// large splits.
    pub async fn fetch_records(&self, limit: Option<usize>) -> Result<Vec<Record>, HubError> {
        let mut pager = self.pages(limit);
        let mut records = Vec::new();
        while let Some(page) = pager.next_page().await? {
            records.extend(page.records);
        }
        Ok(records)
    }
}

/// Sequential cursor over the pages of a split.
pub struct RowPager<'s, 'a> {
    split: &'s SplitApi<'a>,
    offset: usize,
    limit: Option<usize>,
    total: Option<usize>,
}

impl RowPager<'_, '_> {
    /// Rows still expected, once the split size is known.
    fn remaining(&self) -> Option<usize> {
        let cap = match (self.total, self.limit) {
            (Some(total), Some(limit)) => Some(total.min(limit)),
            (Some(total), None) => Some(total),
            (None, Some(limit)) => Some(limit),
            (None, None) => None,
        };
        cap.map(|c| c.saturating_sub(self.offset))
    }

    pub async fn next_page(&mut self) -> Result<Option<RowsPage>, HubError> {
        let page_size = self.split.api.page_size;
        let length = match self.remaining() {
            Some(0) => return Ok(None),
            Some(n) => n.min(page_size),
            None => page_size,
        };

        let mut page = self.split.fetch_page(self.offset, length).await?;
        self.total = Some(page.total);
        if page.records.is_empty() {
            return Ok(None);
        }
        if let Some(remaining) = self.remaining() {
            page.records.truncate(remaining);
        }
        self.offset += page.records.len();
        Ok(Some(page))
    }
}
