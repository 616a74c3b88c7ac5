//! Async wrappers that move KDF work onto tokio's blocking pool
//!
//! Wrapping, unwrapping and login are dominated by the slow KDF. Each flow
//! owns its inputs, so any number can run side by side without locking.

use std::sync::Arc;

use tokio::task;

use crate::crypto::RoomKey;
use crate::envelope::{KeyWrapper, WrappedRoomKey};
use crate::error::{Result, RoomKeyError};
use crate::passphrase::Passphrase;
use crate::room::{login, RoomSession};
use crate::store::RoomStore;

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| RoomKeyError::Interrupted(e.to_string()))?
}

pub async fn wrap_room_key_async(
    wrapper: KeyWrapper,
    room_key: RoomKey,
    passphrase: Passphrase,
) -> Result<WrappedRoomKey> {
    run_blocking(move || wrapper.wrap(&room_key, &passphrase)).await
}

pub async fn unwrap_room_key_async(
    wrapped: WrappedRoomKey,
    passphrase: Passphrase,
) -> Result<RoomKey> {
    run_blocking(move || crate::envelope::unwrap_room_key(&wrapped, &passphrase)).await
}

pub async fn login_async<S>(store: Arc<S>, passphrase: Passphrase) -> Result<RoomSession>
where
    S: RoomStore + 'static,
{
    run_blocking(move || login(store.as_ref(), &passphrase)).await
}
