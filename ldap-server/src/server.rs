//! Per-connection request loop
//!
//! One connection is one [`Framed`] stream over [`LdapCodec`]. PDUs are
//! handled strictly in arrival order:
//!
//! - a decoded message goes to the [`RequestHandler`] and every response it
//!   returns is written back;
//! - a rejected request is answered with its generated error response
//!   without reaching the handler;
//! - an unbind request closes the connection;
//! - a transport-fatal decode error sends a Notice of Disconnection and
//!   closes the connection.

use crate::codec::LdapCodec;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use ldap_codec::{
    ControlRegistry, DecodedPdu, ExtendedResponse, LdapMessage, MessageId, OperationResult,
    ProtocolOp,
};
use ldap_core::{DecoderConfig, LdapError, LdapResult, ResultCode};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

/// OID of the unsolicited Notice of Disconnection (RFC 4511, 4.4.1)
pub const NOTICE_OF_DISCONNECTION_OID: &str = "1.3.6.1.4.1.1466.20036";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub address: SocketAddr,
    /// Decoder limits, copied into every connection
    pub decoder: DecoderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], 389)),
            decoder: DecoderConfig::default(),
        }
    }
}

/// Directory operations behind the codec
///
/// Called once per decoded request, never for unbind or for requests the
/// decoder rejected.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle one request
    ///
    /// # Returns
    /// The responses to write, in order. Search requests typically return
    /// entries and references followed by one `SearchResultDone`; abandon
    /// returns nothing.
    ///
    /// # Errors
    /// Any error closes the connection.
    async fn handle(&self, request: LdapMessage) -> LdapResult<Vec<LdapMessage>>;
}

/// Build the unsolicited notification sent before dropping a connection
pub fn notice_of_disconnection(result_code: ResultCode, diagnostic: impl Into<String>) -> LdapMessage {
    LdapMessage::new(
        MessageId::default(),
        ProtocolOp::ExtendedResponse(ExtendedResponse {
            result: OperationResult::new(result_code, diagnostic),
            name: Some(NOTICE_OF_DISCONNECTION_OID.to_string()),
            value: None,
        }),
    )
}

/// Serve one connection until unbind, end of stream or a fatal error
///
/// # Errors
/// Returns error on I/O failure, on a transport-fatal decode error (after the
/// Notice of Disconnection was attempted) and on handler failure.
pub async fn serve_connection<S, H>(
    stream: S,
    handler: Arc<H>,
    registry: Arc<ControlRegistry>,
    config: DecoderConfig,
) -> LdapResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    H: RequestHandler + ?Sized,
{
    let mut framed = Framed::new(stream, LdapCodec::new(registry, config));

    while let Some(pdu) = framed.next().await {
        match pdu {
            Ok(DecodedPdu::Message(message)) => {
                if message.op == ProtocolOp::UnbindRequest {
                    log::debug!("Unbind (message {}), closing connection", message.message_id);
                    return Ok(());
                }
                for response in handler.handle(message).await? {
                    framed.send(response).await?;
                }
            }
            Ok(DecodedPdu::Rejected(invalid)) => match invalid.to_response() {
                Some(response) => framed.send(response).await?,
                None => log::warn!(
                    "Dropping invalid {} (message {}): {}",
                    invalid.operation.name(),
                    invalid.message_id,
                    invalid.diagnostic
                ),
            },
            Err(LdapError::Decode(e)) => {
                let notice = notice_of_disconnection(e.result_code(), e.to_string());
                if let Err(send_err) = framed.send(notice).await {
                    log::error!("Failed to send notice of disconnection: {}", send_err);
                }
                return Err(LdapError::Decode(e));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldap_codec::{BindRequest, BindResponse, DelRequest, LdapEncoder};
    use ldap_core::DecodeError;
    use tokio::io::AsyncWriteExt;

    fn id(value: u32) -> MessageId {
        MessageId::new(value).unwrap()
    }

    fn encode(message: &LdapMessage) -> Vec<u8> {
        LdapEncoder::encode_to_vec(message).unwrap()
    }

    fn registry() -> Arc<ControlRegistry> {
        Arc::new(ControlRegistry::with_defaults())
    }

    #[tokio::test]
    async fn test_handler_responses_are_written() {
        let bind = LdapMessage::new(
            id(1),
            ProtocolOp::BindRequest(BindRequest::simple("cn=admin", "secret")),
        );
        let response = LdapMessage::new(
            id(1),
            ProtocolOp::BindResponse(BindResponse {
                result: OperationResult::success(),
                server_sasl_creds: None,
            }),
        );
        let unbind = LdapMessage::new(id(2), ProtocolOp::UnbindRequest);

        let mut handler = MockRequestHandler::new();
        let expected = bind.clone();
        let reply = response.clone();
        handler
            .expect_handle()
            .withf(move |request| *request == expected)
            .times(1)
            .returning(move |_| Ok(vec![reply.clone()]));

        let stream = tokio_test::io::Builder::new()
            .read(&encode(&bind))
            .write(&encode(&response))
            .read(&encode(&unbind))
            .build();
        serve_connection(stream, Arc::new(handler), registry(), DecoderConfig::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejected_request_bypasses_handler() {
        let invalid = LdapMessage::new(
            id(3),
            ProtocolOp::DelRequest(DelRequest {
                entry: "cn".to_string(),
            }),
        );
        let mut handler = MockRequestHandler::new();
        handler.expect_handle().never();

        let (client, server) = tokio::io::duplex(4096);
        let task = tokio::spawn(serve_connection(
            server,
            Arc::new(handler),
            registry(),
            DecoderConfig::default(),
        ));
        let mut client = Framed::new(client, LdapCodec::new(registry(), DecoderConfig::default()));
        client.get_mut().write_all(&encode(&invalid)).await.unwrap();
        let response = match client.next().await {
            Some(Ok(DecodedPdu::Message(message))) => message,
            other => panic!("unexpected pdu: {:?}", other),
        };
        assert_eq!(response.message_id, id(3));
        match response.op {
            ProtocolOp::DelResponse(result) => {
                assert_eq!(result.result_code, ResultCode::InvalidDnSyntax);
                assert!(result.diagnostic_message.contains("'cn'"));
            }
            other => panic!("unexpected op: {:?}", other),
        }

        drop(client);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_fatal_error_sends_notice() {
        let (client, server) = tokio::io::duplex(1024);
        let handler = Arc::new(MockRequestHandler::new());
        let task = tokio::spawn(serve_connection(
            server,
            handler,
            registry(),
            DecoderConfig::default(),
        ));

        let mut client = Framed::new(client, LdapCodec::new(registry(), DecoderConfig::default()));
        client
            .get_mut()
            .write_all(&[0x31, 0x03, 0x02, 0x01, 0x01])
            .await
            .unwrap();
        let notice = match client.next().await {
            Some(Ok(DecodedPdu::Message(message))) => message,
            other => panic!("unexpected pdu: {:?}", other),
        };
        assert_eq!(notice.message_id.value(), 0);
        match notice.op {
            ProtocolOp::ExtendedResponse(response) => {
                assert_eq!(response.name.as_deref(), Some(NOTICE_OF_DISCONNECTION_OID));
                assert_eq!(response.result.result_code, ResultCode::ProtocolError);
            }
            other => panic!("unexpected op: {:?}", other),
        }
        assert!(matches!(
            task.await.unwrap(),
            Err(LdapError::Decode(DecodeError::UnexpectedTag { .. }))
        ));
    }

    #[tokio::test]
    async fn test_end_of_stream_closes() {
        let mut handler = MockRequestHandler::new();
        handler.expect_handle().never();
        let stream = tokio_test::io::Builder::new().build();
        serve_connection(stream, Arc::new(handler), registry(), DecoderConfig::default())
            .await
            .unwrap();
    }

    #[test]
    fn test_config_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"address": "127.0.0.1:10389"}"#).unwrap();
        assert_eq!(config.address.port(), 10389);
        assert_eq!(config.decoder, DecoderConfig::default());
    }
}
