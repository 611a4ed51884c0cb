//! Feed boundary: raw CSV lines to validated, typed events.
//!
//! A record is nine comma-separated fields, in order: network time, venue
//! time, message type (`A`/`E`/`D`), instrument, side (`B`/`S`), price,
//! queue position, quantity, order id. A line failing structural validation
//! is rejected here with a [`FeedError`] and never reaches the matching core.

use crate::error::FeedError;
use crate::types::{Deletion, Event, Execution, NewOrder, OrderId, Side};
use rust_decimal::Decimal;

const FIELD_COUNT: usize = 9;

/// Parses and validates one feed line.
pub fn parse_line(line: &str) -> Result<Event, FeedError> {
    let fields: Vec<&str> = line.trim_end_matches(['\n', '\r']).split(',').collect();
    if fields.len() != FIELD_COUNT {
        return Err(FeedError::FieldCount(fields.len()));
    }

    let network_time = parse_positive(fields[0], "network_time")?;
    let venue_time = parse_positive(fields[1], "venue_time")?;
    let side = parse_side(fields[4])?;
    let price = parse_price(fields[5])?;
    let priority = parse_unsigned(fields[6], "que_loc")?;
    let quantity = parse_unsigned(fields[7], "qty")?;
    let order_id = OrderId(parse_positive(fields[8], "id")?);

    match fields[2] {
        "A" => Ok(Event::New(NewOrder {
            network_time,
            venue_time,
            instrument: fields[3].to_string(),
            side,
            price,
            priority,
            quantity,
            order_id,
        })),
        "E" => Ok(Event::Execute(Execution {
            network_time,
            venue_time,
            order_id,
            quantity,
        })),
        "D" => Ok(Event::Delete(Deletion {
            network_time,
            venue_time,
            order_id,
        })),
        other => Err(FeedError::BadMsgType(other.to_string())),
    }
}

fn parse_side(field: &str) -> Result<Side, FeedError> {
    match field {
        "B" => Ok(Side::Buy),
        "S" => Ok(Side::Sell),
        other => Err(FeedError::BadSide(other.to_string())),
    }
}

fn parse_price(field: &str) -> Result<Decimal, FeedError> {
    field
        .parse::<Decimal>()
        .map_err(|_| FeedError::BadPrice(field.to_string()))
}

fn parse_unsigned(field: &str, name: &'static str) -> Result<u64, FeedError> {
    field.parse::<u64>().map_err(|_| FeedError::BadInteger {
        field: name,
        value: field.to_string(),
    })
}

fn parse_positive(field: &str, name: &'static str) -> Result<u64, FeedError> {
    let value = parse_unsigned(field, name)?;
    if value == 0 {
        return Err(FeedError::BadInteger {
            field: name,
            value: field.to_string(),
        });
    }
    Ok(value)
}
