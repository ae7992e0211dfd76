use serde_json::Value;

use super::lifecycle::{DialogLifecycle, DialogMode, PendingDialogState, Readiness};
use super::values::RecordForm;
use crate::bus::{DIALOG_CLOSE, DIALOG_OPEN, Payload, TOAST_SHOW, Toast};
use crate::context::ConsoleContext;
use crate::error::{CoreError, CoreResult};

/// Called once with the server's answer after a successful save.
pub type SaveCallback = Box<dyn FnOnce(&Value) + Send>;

/// A record editor talking to the API and the bus.
///
/// Opening publishes `DIALOG.OPEN` and closing (save, cancel or drop)
/// publishes `DIALOG.CLOSE`, both synchronously. A successful save also
/// queues the record's refresh topic and, for new records, a toast.
pub struct RecordDialog<F: RecordForm> {
    ctx: ConsoleContext,
    lifecycle: DialogLifecycle<F>,
    on_save: Option<SaveCallback>,
    close_published: bool,
}

impl<F: RecordForm> RecordDialog<F> {
    pub fn open(ctx: ConsoleContext, mode: DialogMode) -> Self {
        ctx.bus.publish_sync(DIALOG_OPEN, Payload::Empty);
        log::debug!("Opened {} dialog ({mode:?})", F::NOUN);
        Self {
            ctx,
            lifecycle: DialogLifecycle::open(mode),
            on_save: None,
            close_published: false,
        }
    }

    #[must_use]
    pub fn on_save(mut self, callback: impl FnOnce(&Value) + Send + 'static) -> Self {
        self.on_save = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> &PendingDialogState<F> {
        self.lifecycle.state()
    }

    pub fn readiness(&self) -> Readiness {
        self.lifecycle.readiness()
    }

    pub fn form(&self) -> Option<&F> {
        self.lifecycle.form()
    }

    pub fn title(&self) -> String {
        self.lifecycle.title()
    }

    /// Fetch the record of an edit dialog. No-op unless loading.
    ///
    /// Dropping the returned future abandons the fetch; the dialog stays
    /// `Loading` and can still be cancelled.
    pub async fn load(&mut self) -> CoreResult<()> {
        let DialogMode::Edit(id) = self.lifecycle.mode() else {
            return Ok(());
        };
        if self.lifecycle.readiness() != Readiness::Loading {
            return Ok(());
        }

        let record = self.ctx.client.get(F::ENDPOINT, id).await.map_err(|e| {
            let e = CoreError::from(e);
            e.log(&format!("[{}] Loading record {id} failed", F::ENDPOINT));
            e
        })?;
        self.lifecycle.record_loaded(&record)?;
        Ok(())
    }

    /// Validate and send `values`.
    ///
    /// On success the dialog is closed and the server's answer returned. On
    /// failure it stays open (`Ready`) with field messages where the server
    /// gave any, and nothing is published.
    pub async fn submit(&mut self, values: F) -> CoreResult<Value> {
        let request = self.lifecycle.begin_save(values)?;

        let saved = self
            .ctx
            .client
            .save(request.endpoint, request.id, &request.payload)
            .await;

        match saved {
            Ok(echo) => {
                self.lifecycle.save_succeeded()?;
                if let Some(callback) = self.on_save.take() {
                    callback(&echo);
                }
                self.ctx.bus.publish(F::REFRESH_TOPIC, Payload::Empty);
                if request.id.is_none() {
                    self.ctx
                        .bus
                        .publish(TOAST_SHOW, Toast::new(format!("{} Added", F::NOUN)).auto_hide());
                }
                self.publish_close();
                log::info!("[{}] {} saved", request.endpoint, F::NOUN);
                Ok(echo)
            }
            Err(e) => {
                let e = CoreError::from(e);
                e.log(&format!("[{}] Save failed", request.endpoint));
                self.lifecycle.save_failed(&e);
                Err(e)
            }
        }
    }

    /// Close without saving.
    pub fn cancel(&mut self) {
        if self.lifecycle.cancel() {
            log::debug!("{} dialog cancelled", F::NOUN);
        }
        self.publish_close();
    }

    fn publish_close(&mut self) {
        if !self.close_published {
            self.close_published = true;
            self.ctx.bus.publish_sync(DIALOG_CLOSE, Payload::Empty);
        }
    }
}

impl<F: RecordForm> Drop for RecordDialog<F> {
    fn drop(&mut self) {
        self.publish_close();
    }
}
