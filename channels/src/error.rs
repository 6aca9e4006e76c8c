// src/error.rs

use core::fmt;

// Generates `into_inner`, `Display` and `Error` for enums whose every variant
// carries the value the caller tried to hand over.
macro_rules! impl_error_for_enum_with_inner {
  (
    $enum_name:ident < $generic_param:ident >,
    $($variant:ident ( $message:expr ) ),+
    $(,)?
  ) => {
    impl<$generic_param> $enum_name<$generic_param> {
      /// Consumes the error, returning the value that could not be sent.
      #[inline]
      pub fn into_inner(self) -> $generic_param {
        match self {
          $( $enum_name::$variant(v) => v, )+
        }
      }
    }

    impl<$generic_param> fmt::Display for $enum_name<$generic_param> {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
          $( $enum_name::$variant(_) => f.write_str($message), )+
        }
      }
    }

    impl<$generic_param> std::error::Error for $enum_name<$generic_param> {}
  };
}

/// Error returned by `send` on an unbounded channel that its owner has already
/// closed.
///
/// Sending after close is a bug in the owning code: it means a producer raced
/// the shutdown. The value is handed back so nothing is silently lost, and the
/// result is `#[must_use]` so the misuse cannot go unnoticed. Unwrapping it is
/// the intended way to make the misuse fatal.
#[must_use = "a send after close is a misuse of the channel and must be handled"]
#[derive(PartialEq, Eq, Clone)]
pub enum SendError<T> {
  /// The channel was closed by its owner. The value is returned.
  Closed(T),
}

impl<T> fmt::Debug for SendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SendError::Closed(_) => write!(f, "SendError::Closed(..)"),
    }
  }
}

impl_error_for_enum_with_inner!(
  SendError<T>,
  Closed("send on a closed unbounded channel"),
);

/// Error returned when attempting to close an already closed channel.
#[must_use = "closing a channel twice is a misuse and must be handled"]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CloseError;
impl std::error::Error for CloseError {}
impl fmt::Display for CloseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "channel is already closed")
  }
}

/// Error returned by `try_recv` when an item could not be received immediately.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryRecvError {
  /// Nothing is ready right now, or another caller currently holds the receive side.
  Empty,
  /// The channel is closed and every buffered item has been delivered.
  Disconnected,
}
impl std::error::Error for TryRecvError {}
impl fmt::Display for TryRecvError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TryRecvError::Empty => write!(f, "channel empty"),
      TryRecvError::Disconnected => write!(f, "channel disconnected (closed and drained)"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn send_error_returns_value() {
    let err = SendError::Closed(String::from("late"));
    assert_eq!(err.to_string(), "send on a closed unbounded channel");
    assert_eq!(format!("{:?}", err), "SendError::Closed(..)");
    assert_eq!(err.into_inner(), "late");
  }

  #[test]
  fn display_messages() {
    assert_eq!(CloseError.to_string(), "channel is already closed");
    assert_eq!(TryRecvError::Empty.to_string(), "channel empty");
    assert!(TryRecvError::Disconnected.to_string().contains("disconnected"));
  }
}
