use std::{fmt, str::FromStr, time::Duration};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use futures::StreamExt;
use solana_account_decoder::{UiAccount, UiAccountData, UiAccountEncoding};
use solana_client::{
    nonblocking::{pubsub_client::PubsubClient, rpc_client::RpcClient},
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
};
use solana_pubkey::Pubkey;
use solana_rpc_client_api::filter::{Memcmp, MemcmpEncodedBytes, RpcFilterType};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::{
    AccountBlob, AccountFilter, AccountListener, ChainTransport, KeyedAccountBlob,
    ProgramAccountListener, Subscription,
};
use crate::{
    config::{ClientConfig, Commitment},
    errors::TransportError,
};

/// Transport over a Solana JSON-RPC node and its websocket endpoint.
///
/// Each push subscription owns its own websocket connection, driven by a
/// spawned task until the returned [`Subscription`] is cancelled.
pub struct SolanaTransport {
    rpc: RpcClient,
    ws_url: String,
}

impl fmt::Debug for SolanaTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SolanaTransport {{ rpc: {}, ws: {} }}",
            self.rpc.url(),
            self.ws_url
        )
    }
}

impl SolanaTransport {
    pub fn new(rpc_url: String, ws_url: String, request_timeout: Duration) -> Self {
        let rpc = RpcClient::new_with_timeout(rpc_url, request_timeout);
        Self { rpc, ws_url }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.rpc_url.clone(),
            config.ws_url.clone(),
            config.request_timeout(),
        )
    }
}

fn rpc_error(e: impl fmt::Display) -> TransportError {
    TransportError::Rpc(e.to_string())
}

fn account_config(commitment: Commitment) -> RpcAccountInfoConfig {
    RpcAccountInfoConfig {
        encoding: Some(UiAccountEncoding::Base64),
        commitment: Some(commitment.config()),
        data_slice: None,
        min_context_slot: None,
    }
}

fn program_accounts_config(
    filters: &[AccountFilter],
    commitment: Commitment,
) -> RpcProgramAccountsConfig {
    let filters = filters
        .iter()
        .map(|filter| match filter {
            AccountFilter::DataSize(size) => RpcFilterType::DataSize(*size),
            AccountFilter::Memcmp { offset, bytes } => RpcFilterType::Memcmp(Memcmp::new(
                *offset,
                MemcmpEncodedBytes::Base58(bs58::encode(bytes).into_string()),
            )),
        })
        .collect::<Vec<_>>();
    RpcProgramAccountsConfig {
        filters: (!filters.is_empty()).then_some(filters),
        account_config: account_config(commitment),
        with_context: Some(true),
        ..RpcProgramAccountsConfig::default()
    }
}

fn decode_ui_account(
    address: &Pubkey,
    account: &UiAccount,
    slot: u64,
) -> Result<AccountBlob, TransportError> {
    let data = match &account.data {
        UiAccountData::Binary(encoded, UiAccountEncoding::Base64) => general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| TransportError::InvalidData {
                address: *address,
                reason: format!("base64: {}", e),
            })?,
        UiAccountData::LegacyBinary(encoded) => bs58::decode(encoded).into_vec().map_err(|e| {
            TransportError::InvalidData {
                address: *address,
                reason: format!("base58: {}", e),
            }
        })?,
        _ => {
            return Err(TransportError::InvalidData {
                address: *address,
                reason: "unexpected account encoding".to_string(),
            })
        }
    };
    let owner = Pubkey::from_str(&account.owner).map_err(|e| TransportError::InvalidData {
        address: *address,
        reason: format!("owner: {}", e),
    })?;
    Ok(AccountBlob {
        data,
        lamports: account.lamports,
        owner,
        slot,
    })
}

/// Waits for the subscription task to report whether the stream is live and
/// wraps its shutdown channel into a [`Subscription`].
async fn finish_subscribe(
    label: String,
    ready_rx: oneshot::Receiver<Result<(), TransportError>>,
    shutdown_tx: oneshot::Sender<()>,
) -> Result<Subscription, TransportError> {
    match ready_rx.await {
        Ok(Ok(())) => {
            info!("{} subscription established", label);
            Ok(Subscription::new(label, move || {
                let _ = shutdown_tx.send(());
            }))
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(TransportError::Closed),
    }
}

#[async_trait]
impl ChainTransport for SolanaTransport {
    async fn get_account_info(
        &self,
        address: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<AccountBlob>, TransportError> {
        let response = self
            .rpc
            .get_account_with_commitment(address, commitment.config())
            .await
            .map_err(rpc_error)?;
        let slot = response.context.slot;
        Ok(response.value.map(|account| AccountBlob {
            data: account.data,
            lamports: account.lamports,
            owner: account.owner,
            slot,
        }))
    }

    async fn get_multiple_accounts_info(
        &self,
        addresses: &[Pubkey],
        commitment: Commitment,
    ) -> Result<Vec<Option<AccountBlob>>, TransportError> {
        let response = self
            .rpc
            .get_multiple_accounts_with_commitment(addresses, commitment.config())
            .await
            .map_err(rpc_error)?;
        let slot = response.context.slot;
        Ok(response
            .value
            .into_iter()
            .map(|account| {
                account.map(|account| AccountBlob {
                    data: account.data,
                    lamports: account.lamports,
                    owner: account.owner,
                    slot,
                })
            })
            .collect())
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
        commitment: Commitment,
    ) -> Result<Vec<KeyedAccountBlob>, TransportError> {
        // The scan response carries no context, so the slot is read first.
        let slot = self
            .rpc
            .get_slot_with_commitment(commitment.config())
            .await
            .map_err(rpc_error)?;
        let accounts = self
            .rpc
            .get_program_accounts_with_config(
                program_id,
                program_accounts_config(filters, commitment),
            )
            .await
            .map_err(rpc_error)?;
        debug!(
            "Program scan of {} returned {} accounts",
            program_id,
            accounts.len()
        );
        Ok(accounts
            .into_iter()
            .map(|(address, account)| KeyedAccountBlob {
                address,
                account: AccountBlob {
                    data: account.data,
                    lamports: account.lamports,
                    owner: account.owner,
                    slot,
                },
            })
            .collect())
    }

    async fn on_account_change(
        &self,
        address: &Pubkey,
        commitment: Commitment,
        mut listener: AccountListener,
    ) -> Result<Subscription, TransportError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let ws_url = self.ws_url.clone();
        let address = *address;
        let config = account_config(commitment);

        tokio::spawn(async move {
            let pubsub_client = match PubsubClient::new(&ws_url).await {
                Ok(client) => client,
                Err(e) => {
                    let _ = ready_tx.send(Err(TransportError::Subscription(format!(
                        "failed to connect to {}: {}",
                        ws_url, e
                    ))));
                    return;
                }
            };
            let (mut stream, unsubscribe) =
                match pubsub_client.account_subscribe(&address, Some(config)).await {
                    Ok(subscription) => subscription,
                    Err(e) => {
                        let _ = ready_tx.send(Err(TransportError::Subscription(e.to_string())));
                        return;
                    }
                };
            let _ = ready_tx.send(Ok(()));

            loop {
                tokio::select! {
                    message = stream.next() => match message {
                        Some(response) => {
                            listener(decode_ui_account(&address, &response.value, response.context.slot));
                        }
                        None => {
                            warn!("Account stream for {} closed unexpectedly", address);
                            listener(Err(TransportError::Closed));
                            break;
                        }
                    },
                    _ = &mut shutdown_rx => {
                        debug!("Unsubscribing from account {}", address);
                        break;
                    }
                }
            }
            unsubscribe().await;
        });

        finish_subscribe(format!("account {}", address), ready_rx, shutdown_tx).await
    }

    async fn on_program_account_change(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
        commitment: Commitment,
        mut listener: ProgramAccountListener,
    ) -> Result<Subscription, TransportError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let ws_url = self.ws_url.clone();
        let program_id = *program_id;
        let config = program_accounts_config(filters, commitment);

        tokio::spawn(async move {
            let pubsub_client = match PubsubClient::new(&ws_url).await {
                Ok(client) => client,
                Err(e) => {
                    let _ = ready_tx.send(Err(TransportError::Subscription(format!(
                        "failed to connect to {}: {}",
                        ws_url, e
                    ))));
                    return;
                }
            };
            let (mut stream, unsubscribe) = match pubsub_client
                .program_subscribe(&program_id, Some(config))
                .await
            {
                Ok(subscription) => subscription,
                Err(e) => {
                    let _ = ready_tx.send(Err(TransportError::Subscription(e.to_string())));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));

            loop {
                tokio::select! {
                    message = stream.next() => match message {
                        Some(response) => {
                            let keyed = &response.value;
                            let update = match Pubkey::from_str(&keyed.pubkey) {
                                Ok(address) => {
                                    decode_ui_account(&address, &keyed.account, response.context.slot)
                                        .map(|account| KeyedAccountBlob { address, account })
                                }
                                Err(e) => {
                                    warn!("Invalid pubkey {} in program stream: {}", keyed.pubkey, e);
                                    continue;
                                }
                            };
                            listener(update);
                        }
                        None => {
                            warn!("Program stream for {} closed unexpectedly", program_id);
                            listener(Err(TransportError::Closed));
                            break;
                        }
                    },
                    _ = &mut shutdown_rx => {
                        debug!("Unsubscribing from program {}", program_id);
                        break;
                    }
                }
            }
            unsubscribe().await;
        });

        finish_subscribe(format!("program {}", program_id), ready_rx, shutdown_tx).await
    }
}
