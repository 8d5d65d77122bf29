//! Background round trips. Each job runs on its own thread and reports back
//! over a channel that the UI drains once per frame.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::RgbaImage;

use crate::error::{AnnotateError, Result};
use crate::gate::JobToken;
use crate::overlay::TranslationRecord;
use crate::selection::ImageSelection;
use crate::services::{Collaborators, OcrItem, Translation};

/// Called after a result is queued so the UI wakes up to collect it.
pub type Wake = Arc<dyn Fn() + Send + Sync>;

pub struct InpaintRequest {
    pub token: JobToken,
    pub image_png: Vec<u8>,
    pub mask_png: Vec<u8>,
}

pub struct TranslateRequest {
    pub token: JobToken,
    pub image_png: Vec<u8>,
    pub selections: Vec<ImageSelection>,
}

pub enum JobOutcome {
    Inpainted {
        token: JobToken,
        result: Result<RgbaImage>,
    },
    Translated {
        token: JobToken,
        result: Result<Vec<TranslationRecord>>,
    },
}

pub fn run_inpaint(services: &dyn Collaborators, request: InpaintRequest) -> Result<RgbaImage> {
    services.inpaint(request.image_png, request.mask_png)
}

/// OCR every selection, translate what came back, and pair each translation
/// with the image-space bounds of the selection it belongs to.
pub fn run_translate(
    services: &dyn Collaborators,
    request: TranslateRequest,
) -> Result<Vec<TranslationRecord>> {
    let items: Vec<OcrItem> = services.ocr(request.image_png, &request.selections)?;
    log::info!("ocr returned {} item(s)", items.len());
    let translations = services.translate(&items)?;
    Ok(zip_translations(&request.selections, translations))
}

/// Translations whose id matches no selection are dropped.
pub fn zip_translations(
    selections: &[ImageSelection],
    translations: Vec<Translation>,
) -> Vec<TranslationRecord> {
    translations
        .into_iter()
        .filter_map(|t| {
            let Some(sel) = selections.iter().find(|s| s.id.to_string() == t.id) else {
                log::warn!("translation for unknown selection id {:?}", t.id);
                return None;
            };
            Some(TranslationRecord {
                id: t.id,
                original_text: t.original,
                translated_text: t.translated,
                bounds: sel.rect(),
            })
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// Run a job body, turning a panic into an error so the caller always has
/// an outcome to report and the gate is released.
pub fn catch_job<T>(job: &str, body: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|payload| {
        let msg = panic_message(payload.as_ref());
        log::error!("{job} worker panicked: {msg}");
        Err(AnnotateError::Network(format!("{job} worker panicked: {msg}")))
    })
}

pub fn spawn_inpaint(
    services: Arc<dyn Collaborators>,
    request: InpaintRequest,
    sender: Sender<JobOutcome>,
    wake: Wake,
) {
    thread::spawn(move || {
        let token = request.token;
        let result = catch_job("inpaint", || run_inpaint(services.as_ref(), request));
        if let Err(e) = &result {
            log::error!("inpaint failed: {e}");
        }
        let _ = sender.send(JobOutcome::Inpainted { token, result });
        wake();
    });
}

pub fn spawn_translate(
    services: Arc<dyn Collaborators>,
    request: TranslateRequest,
    sender: Sender<JobOutcome>,
    wake: Wake,
) {
    thread::spawn(move || {
        let token = request.token;
        let result = catch_job("translate", || run_translate(services.as_ref(), request));
        if let Err(e) = &result {
            log::error!("translate failed: {e}");
        }
        let _ = sender.send(JobOutcome::Translated { token, result });
        wake();
    });
}

/// Poll `/health` every `interval` until the receiving side goes away.
pub fn spawn_health_probe(
    services: Arc<dyn Collaborators>,
    interval: Duration,
    sender: Sender<bool>,
    wake: Wake,
) {
    thread::spawn(move || loop {
        let up = match services.health() {
            Ok(()) => true,
            Err(e) => {
                log::debug!("health probe: {e}");
                false
            }
        };
        if sender.send(up).is_err() {
            break;
        }
        wake();
        thread::sleep(interval);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(id: u32) -> ImageSelection {
        ImageSelection {
            id,
            left: 10.0 * id as f32,
            top: 5.0,
            width: 20.0,
            height: 30.0,
        }
    }

    fn translation(id: &str) -> Translation {
        Translation {
            id: id.into(),
            original: "元気".into(),
            translated: "Fine".into(),
        }
    }

    #[test]
    fn translations_pick_up_selection_bounds() {
        let records = zip_translations(&[selection(1), selection(2)], vec![translation("2"), translation("1")]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "2");
        assert_eq!(records[0].bounds, selection(2).rect());
        assert_eq!(records[1].bounds, selection(1).rect());
    }

    #[test]
    fn panicking_jobs_become_errors() {
        let result: Result<()> = catch_job("inpaint", || panic!("model crashed"));
        match result {
            Err(AnnotateError::Network(msg)) => assert!(msg.contains("model crashed")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(catch_job("inpaint", || Ok(3)).unwrap(), 3);
    }

    #[test]
    fn unknown_ids_are_dropped() {
        let records = zip_translations(&[selection(1)], vec![translation("9"), translation("1")]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "1");
    }
}
