//! Reply generation.
//!
//! Every reply is derived from the envelope it answers:
//!
//! | Reply field            | Value                               |
//! |------------------------|-------------------------------------|
//! | `from_party`           | source `to_party`                   |
//! | `to_party`             | source `from_party`                 |
//! | `cpa_id`, `conversation_id` | copied                         |
//! | `service`              | `urn:oasis:names:tc:ebxml-msg:service` |
//! | `ref_to_message_id`    | source `message_id`                 |
//! | `duplicate_elimination`| copied                              |
//! | `ack_requested`        | `false`                             |

use crate::domain::envelope::{
    Envelope, ErrorDetail, MessageData, ACTION_ACKNOWLEDGMENT, ACTION_MESSAGE_ERROR,
    ERROR_CODE_DELIVERY_FAILURE, SERVICE_EBXML_MSG, SEVERITY_WARNING,
};

impl Envelope {
    /// Positive acknowledgment of this message.
    #[must_use]
    pub fn generate_acknowledgment(&self) -> Envelope {
        Envelope {
            action: Some(ACTION_ACKNOWLEDGMENT.to_string()),
            acknowledgment: true,
            ..self.base_reply()
        }
        .with_defaults()
    }

    /// SOAP fault answering this message. Severity defaults to `Error`.
    #[must_use]
    pub fn generate_soap_fault(&self, code: &str, description: &str) -> Envelope {
        Envelope {
            action: Some(ACTION_MESSAGE_ERROR.to_string()),
            error: Some(ErrorDetail::new(code, None, description)),
            ..self.base_reply()
        }
        .with_defaults()
    }

    /// Delivery failure notification for this message (severity `Warning`).
    #[must_use]
    pub fn generate_delivery_failure_notification(&self, description: &str) -> Envelope {
        Envelope {
            action: Some(ACTION_MESSAGE_ERROR.to_string()),
            error: Some(ErrorDetail::new(
                ERROR_CODE_DELIVERY_FAILURE,
                Some(SEVERITY_WARNING),
                description,
            )),
            ..self.base_reply()
        }
        .with_defaults()
    }

    fn base_reply(&self) -> Envelope {
        Envelope {
            from_party: self.to_party.clone(),
            to_party: self.from_party.clone(),
            cpa_id: self.cpa_id.clone(),
            conversation_id: self.conversation_id.clone(),
            service: Some(SERVICE_EBXML_MSG.to_string()),
            action: None,
            message_data: MessageData {
                message_id: None,
                timestamp: None,
                ref_to_message_id: self.message_data.message_id.clone(),
            },
            ack_requested: false,
            acknowledgment: false,
            duplicate_elimination: self.duplicate_elimination,
            error: None,
            references: Vec::new(),
        }
    }
}
