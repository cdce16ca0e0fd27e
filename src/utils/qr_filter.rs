use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

/// Sized for the fleet of printed codes across all offices; false positives
/// just cost one DB lookup.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static QR_CODE_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Check if a scanned payload might be a known code (false positives
/// possible, false negatives not).
pub fn might_exist(payload: &str) -> bool {
    QR_CODE_FILTER
        .read()
        .expect("qr filter poisoned")
        .contains(&payload.to_string())
}

/// Register a newly created code value.
pub fn insert(payload: &str) {
    QR_CODE_FILTER
        .write()
        .expect("qr filter poisoned")
        .add(&payload.to_string());
}

/// Remove a deactivated/deleted code value.
pub fn remove(payload: &str) {
    QR_CODE_FILTER
        .write()
        .expect("qr filter poisoned")
        .remove(&payload.to_string());
}

/// Warm up the filter from the qr_codes table using streaming + batching.
pub async fn warmup_qr_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream =
        sqlx::query_as::<_, (String,)>("SELECT code_value FROM qr_codes WHERE active = 1")
            .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (code_value,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(code_value);
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("QR code filter warmup complete: {} codes", total);
    Ok(())
}

fn insert_batch(codes: &[String]) {
    let mut filter = QR_CODE_FILTER.write().expect("qr filter poisoned");

    for code in codes {
        filter.add(code);
    }
}
