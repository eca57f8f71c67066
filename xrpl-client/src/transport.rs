//! Ledger transport abstraction

use crate::{
    types::{
        AccountInfo, BookOffer, CurrencySpec, PreparedTransaction, SignedTransaction,
        SubmitResponse, TransactionIntent, TrustLine,
    },
    Result,
};
use async_trait::async_trait;

/// Connection to an XRPL node
///
/// Every method fails with [`crate::Error::Connection`] when the node cannot
/// be reached. `submit_and_wait` reports on-ledger failures through the
/// engine result of the returned [`SubmitResponse`], not as an error.
#[async_trait]
pub trait XrplTransport: Send + Sync {
    /// Open the connection; no-op if already connected
    async fn connect(&self) -> Result<()>;

    /// Close the connection; no-op if not connected
    async fn disconnect(&self) -> Result<()>;

    /// Whether the connection is open
    fn is_connected(&self) -> bool;

    /// Fill in sequence, fee and last ledger sequence
    async fn autofill(&self, intent: &TransactionIntent) -> Result<PreparedTransaction>;

    /// Submit a signed blob and wait until it validates or expires
    async fn submit_and_wait(&self, tx: &SignedTransaction) -> Result<SubmitResponse>;

    /// `account_info` against the validated ledger
    async fn account_info(&self, account: &str) -> Result<AccountInfo>;

    /// `account_lines` against the validated ledger
    async fn account_lines(&self, account: &str) -> Result<Vec<TrustLine>>;

    /// `book_offers` for one direction of a book
    async fn book_offers(
        &self,
        taker_gets: &CurrencySpec,
        taker_pays: &CurrencySpec,
    ) -> Result<Vec<BookOffer>>;
}
