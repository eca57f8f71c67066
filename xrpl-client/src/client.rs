//! LedgerClient: single point of XRPL submission
//!
//! Every state change goes through [`LedgerClient::submit`]:
//!
//! 1. Shape validation (no audit record on rejection)
//! 2. Per-account queue: one in-flight transaction per sequence owner
//! 3. Connect, autofill, sign
//! 4. `pending` audit record, then submit-and-wait under a bounded timeout
//! 5. Record updated exactly once: `confirmed` on `tesSUCCESS`, `failed` on a
//!    final engine result; left `pending` when the outcome is unknown

use crate::{
    config::{WalletConfig, XrplConfig},
    signer::{LocalSigner, Signer},
    transport::XrplTransport,
    types::{
        flags, AccountInfo, Amount, BookOffer, CurrencySpec, IssuedAmount, Memo, NFTokenBurn,
        NFTokenMint, Payment, SubmitResponse, TransactionIntent, TrustLine, TrustSet, FTHUSD,
        GOLD_ORDER_NFT_TAXON, MEMBERSHIP_NFT_TAXON, USDF,
    },
    validation::validate_intent,
    Error, Result,
};
use audit_ledger::{
    log_ledger_event, AuditStore, Direction, Flow, LedgerEvent, LedgerKind,
    LedgerTransactionRecord,
};
use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Long-lived operations wallets
///
/// - `issuer`: FTHUSD issuer (credits, FTHUSD authorizations, membership NFTs)
/// - `bonus`: USDF issuer (bonus issuance, USDF authorizations)
/// - `gold`: gold vault (order NFTs, buyback refunds)
/// - `oracle`: PoR anchoring
#[derive(Debug, Clone, Default)]
pub struct OpsSigners {
    /// Bonus wallet
    pub bonus: Option<Arc<dyn Signer>>,
    /// Gold wallet
    pub gold: Option<Arc<dyn Signer>>,
    /// Oracle wallet
    pub oracle: Option<Arc<dyn Signer>>,
    /// Issuer wallet
    pub issuer: Option<Arc<dyn Signer>>,
}

impl OpsSigners {
    /// Local signers for every wallet present in `config`
    pub fn from_config(config: &XrplConfig) -> Result<Self> {
        let load = |wallet: &Option<WalletConfig>| -> Result<Option<Arc<dyn Signer>>> {
            match wallet {
                Some(w) => {
                    let signer = LocalSigner::for_wallet(&w.address, &w.seed)?;
                    Ok(Some(Arc::new(signer) as Arc<dyn Signer>))
                }
                None => Ok(None),
            }
        };
        Ok(Self {
            bonus: load(&config.ops_bonus)?,
            gold: load(&config.ops_gold)?,
            oracle: load(&config.ops_oracle)?,
            issuer: load(&config.ops_issuer)?,
        })
    }
}

/// Buyback of a gold order: the member burns the order NFT, the vault refunds USDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldBuyback {
    /// Member-signed NFT burn
    pub burn: TransactionIntent,
    /// Vault-signed USDF refund
    pub refund: TransactionIntent,
}

/// Per-account submission lanes
///
/// Every client holding the same handle serializes submissions per sending
/// account, so one process never has two transactions in flight for the same
/// sequence owner regardless of which run built the client.
#[derive(Debug, Clone, Default)]
pub struct SubmissionQueues {
    lanes: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl SubmissionQueues {
    /// Empty set of lanes
    pub fn new() -> Self {
        Self::default()
    }

    fn lane(&self, account: &str) -> Arc<Mutex<()>> {
        self.lanes
            .entry(account.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// XRPL ledger client
pub struct LedgerClient {
    config: XrplConfig,
    transport: Arc<dyn XrplTransport>,
    store: Arc<dyn AuditStore>,
    signers: OpsSigners,
    queues: SubmissionQueues,
    correlation_id: Option<String>,
}

impl fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("signers", &self.signers)
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

impl LedgerClient {
    /// Create a client; nothing connects until the first submission or query
    pub fn new(
        config: XrplConfig,
        transport: Arc<dyn XrplTransport>,
        store: Arc<dyn AuditStore>,
        signers: OpsSigners,
    ) -> Self {
        Self {
            config,
            transport,
            store,
            signers,
            queues: SubmissionQueues::new(),
            correlation_id: None,
        }
    }

    /// Share submission lanes with other clients of the same process
    pub fn with_submission_queues(mut self, queues: SubmissionQueues) -> Self {
        self.queues = queues;
        self
    }

    /// Tag every record written by this client with `correlation_id`
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Configuration
    pub fn config(&self) -> &XrplConfig {
        &self.config
    }

    /// Connect; no-op if already connected
    pub async fn connect(&self) -> Result<()> {
        if self.transport.is_connected() {
            return Ok(());
        }
        self.transport.connect().await?;
        info!(url = %self.config.rpc_url, "XRPL connected");
        Ok(())
    }

    /// Disconnect; no-op if not connected
    pub async fn disconnect(&self) -> Result<()> {
        if !self.transport.is_connected() {
            return Ok(());
        }
        self.transport.disconnect().await?;
        info!("XRPL disconnected");
        Ok(())
    }

    /// Validate, sign, record and submit one transaction
    ///
    /// `subject` is the member the operation is attributed to in the audit trail.
    pub async fn submit(
        &self,
        signer: &dyn Signer,
        intent: TransactionIntent,
        flow: Flow,
        subject: Option<&str>,
    ) -> Result<SubmitResponse> {
        validate_intent(&intent)?;
        if signer.address() != intent.account() {
            return Err(Error::Validation(format!(
                "Signer {} cannot sign for account {}",
                signer.address(),
                intent.account()
            )));
        }

        let lane = self.queues.lane(intent.account());
        let _in_flight = lane.lock().await;

        self.connect().await?;
        let prepared = self.transport.autofill(&intent).await?;
        let signed = signer.sign(&prepared).await?;

        let mut record = LedgerTransactionRecord::pending(LedgerKind::Xrpl, flow, self.direction_of(&intent))
            .with_member(subject.map(str::to_string))
            .with_wallet(signer.address())
            .with_tx_hash(signed.hash.clone())
            .with_payload(&intent.summary());
        if let Some(correlation_id) = &self.correlation_id {
            record = record.with_correlation_id(correlation_id.clone());
        }
        self.store.create(&record).await?;
        log_ledger_event(&LedgerEvent::from(&record));

        debug!(
            tx_hash = %signed.hash,
            sequence = prepared.sequence,
            tx_type = intent.transaction_type(),
            "Submitting transaction"
        );

        let outcome = tokio::time::timeout(
            self.config.submit_timeout(),
            self.transport.submit_and_wait(&signed),
        )
        .await;

        let response = match outcome {
            Err(_) => {
                warn!(
                    flow = %flow,
                    tx_hash = %signed.hash,
                    timeout_secs = self.config.submit_timeout_secs,
                    "Submission timed out; record left pending"
                );
                return Err(Error::Timeout { tx_hash: signed.hash });
            }
            Ok(Err(e)) => {
                warn!(
                    flow = %flow,
                    tx_hash = %signed.hash,
                    error = %e,
                    "Transport failed after submission; record left pending"
                );
                return Err(Error::OutcomeUnknown {
                    tx_hash: signed.hash,
                    reason: e.to_string(),
                });
            }
            Ok(Ok(response)) => response,
        };

        if response.is_success() {
            record.confirm(Some(response.tx_hash.clone()))?;
            self.store.update(&record).await?;
            log_ledger_event(&LedgerEvent::from(&record));
            Ok(response)
        } else {
            record.fail(
                Some(response.engine_result.clone()),
                response.engine_result_message.clone(),
            )?;
            self.store.update(&record).await?;
            log_ledger_event(&LedgerEvent::from(&record));
            Err(Error::Transaction {
                code: response.engine_result,
                message: response.engine_result_message,
                tx_hash: signed.hash,
            })
        }
    }

    fn direction_of(&self, intent: &TransactionIntent) -> Direction {
        let program_accounts = [
            self.config.fthusd_issuer.as_str(),
            self.config.usdf_issuer.as_str(),
            self.config.gold_vault.as_str(),
        ];
        if !program_accounts.contains(&intent.account())
            && program_accounts.contains(&intent.destination())
        {
            Direction::Inbound
        } else {
            Direction::Outbound
        }
    }

    fn require<'a>(slot: &'a Option<Arc<dyn Signer>>, role: &str) -> Result<&'a Arc<dyn Signer>> {
        slot.as_ref()
            .ok_or_else(|| Error::Config(format!("Operations wallet '{}' is not configured", role)))
    }

    // ===== Trustlines =====

    /// Member-side FTHUSD and USDF trustlines, both with `tfSetNoRipple`
    pub fn build_member_trust_set(&self, member: &str) -> Vec<TransactionIntent> {
        vec![
            TransactionIntent::TrustSet(TrustSet::member_line(
                member,
                FTHUSD,
                &self.config.fthusd_issuer,
                self.config.trust_limits.fthusd,
            )),
            TransactionIntent::TrustSet(TrustSet::member_line(
                member,
                USDF,
                &self.config.usdf_issuer,
                self.config.trust_limits.usdf,
            )),
        ]
    }

    /// Submit both member trustlines with the member's own signer
    pub async fn set_member_trustlines(&self, member: &dyn Signer) -> Result<Vec<SubmitResponse>> {
        let mut responses = Vec::new();
        for intent in self.build_member_trust_set(member.address()) {
            responses.push(
                self.submit(member, intent, Flow::MemberTrustline, Some(member.address()))
                    .await?,
            );
        }
        Ok(responses)
    }

    /// Issuer authorization of the member's FTHUSD and USDF trustlines
    pub async fn authorize_member_trustlines(&self, member: &str) -> Result<Vec<SubmitResponse>> {
        let issuer = Self::require(&self.signers.issuer, "issuer")?;
        let bonus = Self::require(&self.signers.bonus, "bonus")?;

        let fthusd = TransactionIntent::TrustSet(TrustSet::authorization(
            &self.config.fthusd_issuer,
            FTHUSD,
            member,
        ));
        let usdf = TransactionIntent::TrustSet(TrustSet::authorization(
            &self.config.usdf_issuer,
            USDF,
            member,
        ));

        Ok(vec![
            self.submit(issuer.as_ref(), fthusd, Flow::MemberOnboardingFthusdAuth, Some(member))
                .await?,
            self.submit(bonus.as_ref(), usdf, Flow::MemberOnboardingUsdfAuth, Some(member))
                .await?,
        ])
    }

    /// Gold vault USDF trustline, authorized by the USDF issuer
    ///
    /// The vault receives USDF for gold orders and refunds it on buyback.
    pub async fn set_gold_vault_trustline(&self) -> Result<Vec<SubmitResponse>> {
        let bonus = Self::require(&self.signers.bonus, "bonus")?;
        let gold = Self::require(&self.signers.gold, "gold")?;
        let vault = self.config.gold_vault.as_str();

        let auth = TransactionIntent::TrustSet(TrustSet::authorization(
            &self.config.usdf_issuer,
            USDF,
            vault,
        ));
        let line = TransactionIntent::TrustSet(TrustSet::member_line(
            vault,
            USDF,
            &self.config.usdf_issuer,
            self.config.trust_limits.usdf,
        ));

        Ok(vec![
            self.submit(bonus.as_ref(), auth, Flow::MemberOnboardingUsdfAuth, Some(vault))
                .await?,
            self.submit(gold.as_ref(), line, Flow::MemberTrustline, Some(vault))
                .await?,
        ])
    }

    // ===== FTHUSD =====

    /// Credit FTHUSD to a member against a bank deposit
    pub async fn credit_fthusd(
        &self,
        member: &str,
        amount: Decimal,
        deposit_id: &str,
    ) -> Result<SubmitResponse> {
        let issuer = Self::require(&self.signers.issuer, "issuer")?;
        let payment = Payment::direct(
            &self.config.fthusd_issuer,
            member,
            Amount::Issued(IssuedAmount::new(FTHUSD, &self.config.fthusd_issuer, amount)),
        )
        .with_memo("deposit_id", deposit_id);

        self.submit(
            issuer.as_ref(),
            TransactionIntent::Payment(payment),
            Flow::FthusdDeposit,
            Some(member),
        )
        .await
    }

    /// Member-to-issuer FTHUSD return; submit with the member's signer and
    /// [`Flow::FthusdRedemption`]
    pub fn build_fthusd_redemption(
        &self,
        member: &str,
        amount: Decimal,
        redemption_id: &str,
    ) -> TransactionIntent {
        TransactionIntent::Payment(
            Payment::direct(
                member,
                &self.config.fthusd_issuer,
                Amount::Issued(IssuedAmount::new(FTHUSD, &self.config.fthusd_issuer, amount)),
            )
            .with_memo("redemption_id", redemption_id),
        )
    }

    // ===== USDF =====

    /// Issue USDF rewards to a member
    pub async fn issue_usdf_bonus(
        &self,
        member: &str,
        amount: Decimal,
        batch_id: &str,
        date: NaiveDate,
    ) -> Result<SubmitResponse> {
        let bonus = Self::require(&self.signers.bonus, "bonus")?;
        let payment = Payment::direct(
            &self.config.usdf_issuer,
            member,
            Amount::Issued(IssuedAmount::new(USDF, &self.config.usdf_issuer, amount)),
        )
        .with_memo("bonus_batch_id", batch_id)
        .with_memo("bonus_date", date.format("%Y-%m-%d").to_string());

        self.submit(
            bonus.as_ref(),
            TransactionIntent::Payment(payment),
            Flow::BonusIssue,
            Some(member),
        )
        .await
    }

    /// Member-to-vault USDF payment for a gold order; submit with the member's
    /// signer and [`Flow::GoldOrderCreate`]
    pub fn build_gold_order_payment(
        &self,
        member: &str,
        usdf_amount: Decimal,
        order_id: &str,
    ) -> TransactionIntent {
        TransactionIntent::Payment(
            Payment::direct(
                member,
                &self.config.gold_vault,
                Amount::Issued(IssuedAmount::new(USDF, &self.config.usdf_issuer, usdf_amount)),
            )
            .with_memo("gold_order_id", order_id),
        )
    }

    // ===== NFTs =====

    /// Mint a transferable gold-order NFT to `to`
    pub async fn mint_gold_order_nft(
        &self,
        to: &str,
        order_id: &str,
        uri: &str,
    ) -> Result<SubmitResponse> {
        let gold = Self::require(&self.signers.gold, "gold")?;
        let mint = NFTokenMint {
            account: gold.address().to_string(),
            taxon: GOLD_ORDER_NFT_TAXON,
            flags: flags::TF_TRANSFERABLE,
            uri: uri.to_string(),
            destination: Some(to.to_string()),
            memos: vec![Memo::new("gold_order_id", order_id)],
        };
        self.submit(
            gold.as_ref(),
            TransactionIntent::NFTokenMint(mint),
            Flow::GoldOrderNftMint,
            Some(to),
        )
        .await
    }

    /// Mint a non-transferable membership NFT to `to`
    pub async fn mint_membership_nft(
        &self,
        to: &str,
        member_id: &str,
        uri: &str,
    ) -> Result<SubmitResponse> {
        let issuer = Self::require(&self.signers.issuer, "issuer")?;
        let mint = NFTokenMint {
            account: issuer.address().to_string(),
            taxon: MEMBERSHIP_NFT_TAXON,
            flags: 0,
            uri: uri.to_string(),
            destination: Some(to.to_string()),
            memos: vec![Memo::new("member_id", member_id)],
        };
        self.submit(
            issuer.as_ref(),
            TransactionIntent::NFTokenMint(mint),
            Flow::MembershipNftMint,
            Some(to),
        )
        .await
    }

    /// Burn of an NFT held by `owner`
    pub fn build_nft_burn(&self, owner: &str, nftoken_id: &str) -> TransactionIntent {
        TransactionIntent::NFTokenBurn(NFTokenBurn {
            account: owner.to_string(),
            nftoken_id: nftoken_id.to_string(),
            memos: Vec::new(),
        })
    }

    /// Burn of the order NFT plus the vault's USDF refund
    pub fn build_gold_buyback(
        &self,
        member: &str,
        nftoken_id: &str,
        order_id: &str,
        refund_usdf: Decimal,
    ) -> GoldBuyback {
        let burn = NFTokenBurn {
            account: member.to_string(),
            nftoken_id: nftoken_id.to_string(),
            memos: vec![Memo::new("gold_order_id", order_id)],
        };

        let refund = Payment::direct(
            &self.config.gold_vault,
            member,
            Amount::Issued(IssuedAmount::new(USDF, &self.config.usdf_issuer, refund_usdf)),
        )
        .with_memo("gold_order_id", order_id)
        .with_memo("buyback", "refund");

        GoldBuyback {
            burn: TransactionIntent::NFTokenBurn(burn),
            refund: TransactionIntent::Payment(refund),
        }
    }

    // ===== PoR anchoring =====

    /// Anchor a PoR hash: 1-drop payment from the oracle wallet to the oracle account
    pub async fn anchor_por(&self, por_hash: &str, as_of: &str) -> Result<SubmitResponse> {
        let oracle = Self::require(&self.signers.oracle, "oracle")?;
        let payment = Payment::direct(oracle.address(), &self.config.oracle_account, Amount::Drops(1))
            .with_memo("por_hash", por_hash)
            .with_memo("por_time", as_of);

        self.submit(
            oracle.as_ref(),
            TransactionIntent::Payment(payment),
            Flow::PorAnchoring,
            None,
        )
        .await
    }

    // ===== Queries =====

    /// `account_info` for `account`
    pub async fn account_info(&self, account: &str) -> Result<AccountInfo> {
        self.connect().await?;
        self.transport.account_info(account).await
    }

    /// Trustlines of `account`
    pub async fn account_lines(&self, account: &str) -> Result<Vec<TrustLine>> {
        self.connect().await?;
        self.transport.account_lines(account).await
    }

    /// Outstanding supply of `currency`: absolute sum of the issuer's line balances
    pub async fn issued_supply(&self, issuer: &str, currency: &str) -> Result<Decimal> {
        let lines = self.account_lines(issuer).await?;
        let total: Decimal = lines
            .iter()
            .filter(|line| line.currency == currency)
            .map(|line| line.balance)
            .sum();
        Ok(total.abs())
    }

    /// Supply held outside the program's own accounts
    ///
    /// USDF paid into the gold vault has been spent on gold and no longer circulates.
    pub async fn circulating_supply(&self, issuer: &str, currency: &str) -> Result<Decimal> {
        let lines = self.account_lines(issuer).await?;
        let total: Decimal = lines
            .iter()
            .filter(|line| line.currency == currency && line.account != self.config.gold_vault)
            .map(|line| line.balance)
            .sum();
        Ok(total.abs())
    }

    /// Circulating FTHUSD
    pub async fn fthusd_supply(&self) -> Result<Decimal> {
        self.circulating_supply(&self.config.fthusd_issuer, FTHUSD).await
    }

    /// Circulating USDF
    pub async fn usdf_supply(&self) -> Result<Decimal> {
        self.circulating_supply(&self.config.usdf_issuer, USDF).await
    }

    /// Offers for one direction of a book
    pub async fn book_offers(
        &self,
        taker_gets: &CurrencySpec,
        taker_pays: &CurrencySpec,
    ) -> Result<Vec<BookOffer>> {
        self.connect().await?;
        self.transport.book_offers(taker_gets, taker_pays).await
    }
}
