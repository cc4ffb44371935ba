// src/testutil.rs
//! Shared fixtures: trip tables and a throwaway HTTP responder.

use anyhow::Result;
use arrow::array::{ArrayRef, Float64Array, Int64Array, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::process::columns::*;

/// 2025-01-01T08:00:00 in microseconds.
const PICKUP_US: i64 = 1_735_718_400_000_000;

#[derive(Debug, Clone)]
pub(crate) struct TripRow {
    pub pickup: Option<i64>,
    pub dropoff: Option<i64>,
    pub passengers: Option<i64>,
    pub distance: Option<f64>,
    pub fare: Option<f64>,
    pub extra: Option<f64>,
    pub mta_tax: Option<f64>,
    pub tip: Option<f64>,
    pub tolls: Option<f64>,
    pub total: Option<f64>,
}

impl TripRow {
    /// A ten minute, 2.1 mile ride that passes every check.
    pub fn valid() -> Self {
        Self {
            pickup: Some(PICKUP_US),
            dropoff: Some(PICKUP_US + 600_000_000),
            passengers: Some(1),
            distance: Some(2.1),
            fare: Some(12.0),
            extra: Some(1.0),
            mta_tax: Some(0.5),
            tip: Some(2.0),
            tolls: Some(0.0),
            total: Some(15.5),
        }
    }
}

pub(crate) fn trips(rows: &[TripRow]) -> RecordBatch {
    let ts = DataType::Timestamp(TimeUnit::Microsecond, None);
    let schema = Arc::new(Schema::new(vec![
        Field::new(PICKUP_DATETIME, ts.clone(), true),
        Field::new(DROPOFF_DATETIME, ts, true),
        Field::new(PASSENGER_COUNT, DataType::Int64, true),
        Field::new(TRIP_DISTANCE, DataType::Float64, true),
        Field::new(FARE_AMOUNT, DataType::Float64, true),
        Field::new(EXTRA, DataType::Float64, true),
        Field::new(MTA_TAX, DataType::Float64, true),
        Field::new(TIP_AMOUNT, DataType::Float64, true),
        Field::new(TOLLS_AMOUNT, DataType::Float64, true),
        Field::new(TOTAL_AMOUNT, DataType::Float64, true),
    ]));

    let floats = |f: fn(&TripRow) -> Option<f64>| -> ArrayRef {
        Arc::new(rows.iter().map(f).collect::<Float64Array>())
    };
    let columns: Vec<ArrayRef> = vec![
        Arc::new(rows.iter().map(|r| r.pickup).collect::<TimestampMicrosecondArray>()),
        Arc::new(rows.iter().map(|r| r.dropoff).collect::<TimestampMicrosecondArray>()),
        Arc::new(rows.iter().map(|r| r.passengers).collect::<Int64Array>()),
        floats(|r| r.distance),
        floats(|r| r.fare),
        floats(|r| r.extra),
        floats(|r| r.mta_tax),
        floats(|r| r.tip),
        floats(|r| r.tolls),
        floats(|r| r.total),
    ];
    RecordBatch::try_new(schema, columns).expect("fixture columns match schema")
}

/// Serialize `batch` the way the TLC publishes it.
pub(crate) fn parquet_bytes(batch: &RecordBatch) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(buf)
}

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Body(Vec<u8>),
    Status(u16),
    /// Accept the request and never answer.
    Hang,
    /// A 200 whose body goes out one chunk at a time, `gap` apart.
    Trickle { chunks: Vec<Vec<u8>>, gap: Duration },
}

/// Serve `routes` (keyed by request path) on an ephemeral port; unknown paths get a 404.
/// Returns the base URL, `http://127.0.0.1:<port>/trip-data`.
pub(crate) async fn serve(routes: HashMap<String, Reply>) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let routes = Arc::clone(&routes);
            tokio::spawn(async move {
                let _ = respond(socket, &routes).await;
            });
        }
    });

    Ok(format!("http://{}/trip-data", addr))
}

async fn respond(mut socket: TcpStream, routes: &HashMap<String, Reply>) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&request);
    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();

    let (status, chunks, gap) = match routes.get(&path) {
        Some(Reply::Body(bytes)) => (200, vec![bytes.clone()], Duration::ZERO),
        Some(Reply::Status(code)) => (*code, Vec::new(), Duration::ZERO),
        Some(Reply::Hang) => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            return Ok(());
        }
        Some(Reply::Trickle { chunks, gap }) => (200, chunks.clone(), *gap),
        None => (404, vec![b"not found".to_vec()], Duration::ZERO),
    };

    let length: usize = chunks.iter().map(Vec::len).sum();
    let head = format!(
        "HTTP/1.1 {} X\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
        status, length
    );
    socket.write_all(head.as_bytes()).await?;
    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(gap).await;
        }
        socket.write_all(chunk).await?;
        socket.flush().await?;
    }
    socket.shutdown().await
}

/// Path component the fetcher requests for `YYYY-MM`.
pub(crate) fn month_path(year: i32, month: u32) -> String {
    format!("/trip-data/yellow_tripdata_{}-{:02}.parquet", year, month)
}
