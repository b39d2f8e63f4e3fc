//! The reconciling sink.
//!
//! `attach` connects one live subscription to one container: every snapshot
//! the subscription emits is merged into the container in place. The
//! subscription lives exactly as long as the scope it was attached in.

use crate::options::ReconcileOptions;
use crate::reconcile::Reconcile;
use crate::status::QueryStatus;
use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::Cell;
use rill_core::{Emission, Observer, Subscribable};
use rill_reactive::{Scope, Signal};
use tracing::{debug, error, trace, warn};

/// Subscribes to `subscribable` and reconciles every snapshot into `container`.
///
/// The subscription is disposed exactly once, when `cx` is disposed (or
/// immediately, if `cx` already is). Emissions arriving after that are
/// dropped. Read failures leave the container untouched.
pub fn attach<C>(
    cx: &Scope,
    subscribable: &dyn Subscribable<C::Snapshot>,
    container: C,
    options: ReconcileOptions,
) where
    C: Reconcile + 'static,
{
    attach_with_status(cx, subscribable, container, options, None);
}

/// Like [`attach`], additionally reflecting deliveries into `status`.
pub fn attach_with_status<C>(
    cx: &Scope,
    subscribable: &dyn Subscribable<C::Snapshot>,
    container: C,
    options: ReconcileOptions,
    status: Option<Signal<QueryStatus>>,
) where
    C: Reconcile + 'static,
{
    subscribe_guarded(cx, subscribable, status, move |snapshot| {
        let report = container.reconcile(snapshot, &options);
        trace!(
            inserted = report.inserted,
            removed = report.removed,
            updated = report.updated,
            fields = report.fields_written,
            resequenced = report.resequenced,
            "reconciled snapshot"
        );
    });
}

/// Subscribes with an observer that stops delivering once `cx` is disposed.
///
/// `on_next` receives snapshots; failures are logged and recorded in
/// `status`. The disposer is bound to `cx`.
pub(crate) fn subscribe_guarded<T, F>(
    cx: &Scope,
    subscribable: &dyn Subscribable<T>,
    status: Option<Signal<QueryStatus>>,
    mut on_next: F,
) where
    T: 'static,
    F: FnMut(T) + 'static,
{
    let live = Rc::new(Cell::new(true));

    let guard = live.clone();
    let observer: Observer<T> = Box::new(move |emission| {
        if !guard.get() {
            warn!("dropping emission from a disposed live query");
            return;
        }
        match emission {
            Emission::Next(snapshot) => {
                on_next(snapshot);
                if let Some(status) = &status {
                    status.set(QueryStatus::Ready);
                }
            }
            Emission::Error(err) => {
                error!(error = %err, "live query failed");
                if let Some(status) = &status {
                    status.set(QueryStatus::Failed(err));
                }
            }
        }
    });

    debug!(scope = cx.id(), "opening live query");
    let dispose = subscribable.subscribe(observer).into_fn();

    let scope = cx.id();
    cx.on_cleanup(move || {
        live.set(false);
        debug!(scope = scope, "closing live query");
        dispose();
    });
}
