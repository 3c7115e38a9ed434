//! The Hub RPC collaborator trait.
//!
//! Read-only access to a Hub's message set. A Hub is a possibly
//! unavailable remote dependency: not-found is an expected answer
//! (`Ok(None)`), and transport failures surface as the implementation's
//! error type so callers can retry the unit of work being processed.

use std::future::Future;

use castline_core::id::Fid;

use crate::wire::{Message, MessagesPage};

/// Abstraction over a Hub's read API.
///
/// Paged methods take the opaque cursor from the previous page (`None`
/// for the first page) and keep returning a `next_page_token` until the
/// set is exhausted.
pub trait HubClient: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch a single cast by author and canonical hash. `Ok(None)` when
  /// the Hub does not know the message.
  fn cast_by_id<'a>(
    &'a self,
    fid: Fid,
    hash: &'a str,
  ) -> impl Future<Output = Result<Option<Message>, Self::Error>> + Send + 'a;

  fn casts_by_fid<'a>(
    &'a self,
    fid: Fid,
    page_token: Option<&'a str>,
  ) -> impl Future<Output = Result<MessagesPage, Self::Error>> + Send + 'a;

  fn reactions_by_fid<'a>(
    &'a self,
    fid: Fid,
    page_token: Option<&'a str>,
  ) -> impl Future<Output = Result<MessagesPage, Self::Error>> + Send + 'a;

  fn links_by_fid<'a>(
    &'a self,
    fid: Fid,
    page_token: Option<&'a str>,
  ) -> impl Future<Output = Result<MessagesPage, Self::Error>> + Send + 'a;

  fn verifications_by_fid<'a>(
    &'a self,
    fid: Fid,
    page_token: Option<&'a str>,
  ) -> impl Future<Output = Result<MessagesPage, Self::Error>> + Send + 'a;

  fn user_data_by_fid<'a>(
    &'a self,
    fid: Fid,
    page_token: Option<&'a str>,
  ) -> impl Future<Output = Result<MessagesPage, Self::Error>> + Send + 'a;

  fn username_proofs_by_fid<'a>(
    &'a self,
    fid: Fid,
    page_token: Option<&'a str>,
  ) -> impl Future<Output = Result<MessagesPage, Self::Error>> + Send + 'a;
}
