//! The single-use delivery end of one webhook call.
//!
//! The transport hands the router a `oneshot` sender per inbound call and
//! guarantees it accepts exactly one terminal disposition. [`ReplySlot`]
//! enforces the exactly-once side on the router: the answer path and the
//! timeout path both race to `fulfill`, the first writer wins and everyone
//! else observes [`FulfillError::AlreadySpent`].

use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::wire::AppResponse;

/// The one terminal outcome of a webhook call.
#[derive(Debug)]
pub enum Disposition {
    /// A successful response body.
    Reply(Box<AppResponse>),
    /// The call is rejected with an error status; used when the payload could
    /// not even be normalized.
    Reject { status: u16, message: String },
}

#[derive(Debug, PartialEq, Eq)]
pub enum FulfillError {
    /// Someone already dispositioned this call.
    AlreadySpent,
    /// The transport dropped its receiving half.
    Closed,
}

#[derive(Debug)]
pub struct ReplySlot {
    tx: Mutex<Option<oneshot::Sender<Disposition>>>,
}

impl ReplySlot {
    pub fn new(tx: oneshot::Sender<Disposition>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    /// Builds a slot together with the receiving half, mainly for tests and
    /// in-process transports.
    pub fn channel() -> (Self, oneshot::Receiver<Disposition>) {
        let (tx, rx) = oneshot::channel();
        (Self::new(tx), rx)
    }

    /// Delivers the disposition. First caller wins; the slot is spent
    /// afterwards no matter what.
    pub fn fulfill(&self, disposition: Disposition) -> Result<(), FulfillError> {
        let sender = self.tx.lock().unwrap().take();
        match sender {
            Some(sender) => sender.send(disposition).map_err(|_| FulfillError::Closed),
            None => Err(FulfillError::AlreadySpent),
        }
    }

    pub fn reply(&self, response: AppResponse) -> Result<(), FulfillError> {
        self.fulfill(Disposition::Reply(Box::new(response)))
    }

    pub fn reject(&self, status: u16, message: impl Into<String>) -> Result<(), FulfillError> {
        self.fulfill(Disposition::Reject {
            status,
            message: message.into(),
        })
    }

    /// Whether a disposition has already been taken out of this slot.
    pub fn is_spent(&self) -> bool {
        self.tx.lock().unwrap().is_none()
    }
}
