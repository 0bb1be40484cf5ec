use serde::{Deserialize, Serialize};

use crate::error::BurnError;

/// : pagination cursor echoed back by the indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageParams {
    pub block_number: i64,
    pub index: i64,
    pub items_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressRef {
    pub hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TotalRef {
    pub value: String,
    #[allow(dead_code)]
    pub decimals: Option<String>,
}

/// One element of `items` in 's response shape. Only the fields the
/// Aggregator reads are modeled; everything else is ignored at parse time.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferItem {
    pub block_number: i64,
    pub timestamp: String,
    pub transaction_hash: String,
    pub from: AddressRef,
    pub to: AddressRef,
    pub total: TotalRef,
    pub log_index: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexerPage {
    pub items: Vec<TransferItem>,
    pub next_page_params: Option<PageParams>,
}

/// Thin HTTP client over the external token-transfer indexer: build the URL,
/// send, check `status().is_success()`, decode JSON, map failures to a typed
/// error rather than panicking.
#[derive(Clone)]
pub struct IndexerClient {
    http: reqwest::Client,
    base_url: String,
    tru_contract: String,
}

impl IndexerClient {
    pub fn new(base_url: impl Into<String>, tru_contract: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            tru_contract: tru_contract.into(),
        }
    }

    /// GETs one page of transfers to `burn_address`. Returns
    /// `Ok(None)` on any non-2xx response so the caller can stop paginating
    /// this address without treating it as fatal.
    pub async fn fetch_page(
        &self,
        burn_address: &str,
        page: Option<&PageParams>,
    ) -> Result<Option<IndexerPage>, BurnError> {
        let url = format!("{}/addresses/{}/token-transfers", self.base_url, burn_address);
        let mut query = vec![("token", self.tru_contract.clone()), ("type", "ERC-20".to_string())];
        if let Some(page) = page {
            query.push(("block_number", page.block_number.to_string()));
            query.push(("index", page.index.to_string()));
            query.push(("items_count", page.items_count.to_string()));
        }

        let response = self.http.get(url).query(&query).send().await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let page: IndexerPage = response.json().await?;
        Ok(Some(page))
    }
}
