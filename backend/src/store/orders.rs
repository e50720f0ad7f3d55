use super::{now_timestamp, Db, StoreError};
use common::model::order::{Order, PaymentStatus};
use common::requests::NewOrder;
use rusqlite::{params, OptionalExtension, Row};

const ORDER_COLUMNS: &str = "id, national_id, id_serial, full_name, phone, registration_serial, \
    registration_no, plate, brand, model, year, provider, price, payment_status, created_at";

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    let status: String = row.get(13)?;
    let price: i64 = row.get(12)?;
    Ok(Order {
        id: row.get(0)?,
        national_id: row.get(1)?,
        id_serial: row.get(2)?,
        full_name: row.get(3)?,
        phone: row.get(4)?,
        registration_serial: row.get(5)?,
        registration_no: row.get(6)?,
        plate: row.get(7)?,
        brand: row.get(8)?,
        model: row.get(9)?,
        year: row.get(10)?,
        provider: row.get(11)?,
        price: price.max(0) as u64,
        payment_status: PaymentStatus::parse(&status).unwrap_or(PaymentStatus::Pending),
        created_at: row.get(14)?,
    })
}

impl Db {
    /// Stores a new order as `pending` and returns it with its id.
    pub fn insert_order(&self, order: &NewOrder) -> Result<Order, StoreError> {
        let price = i64::try_from(order.price).map_err(|_| StoreError::OutOfRange("price"))?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO orders (national_id, id_serial, full_name, phone, registration_serial, \
                 registration_no, plate, brand, model, year, provider, price, payment_status, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    order.national_id,
                    order.id_serial,
                    order.full_name,
                    order.phone,
                    order.registration_serial,
                    order.registration_no,
                    order.plate,
                    order.brand,
                    order.model,
                    order.year,
                    order.provider,
                    price,
                    PaymentStatus::Pending.as_str(),
                    now_timestamp(),
                ],
            )?;
            let id = conn.last_insert_rowid();
            let stored = conn.query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
                params![id],
                order_from_row,
            )?;
            Ok(stored)
        })
    }

    /// All orders, newest first.
    pub fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map([], order_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
        self.with_conn(|conn| {
            let order = conn
                .query_row(
                    &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
                    params![id],
                    order_from_row,
                )
                .optional()?;
            Ok(order)
        })
    }

    /// Returns `false` when no order has this id.
    pub fn set_order_status(&self, id: i64, status: PaymentStatus) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE orders SET payment_status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_order(&self, id: i64) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM orders WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
    }

    /// Deletes orders created strictly before `cutoff` (same timestamp format
    /// as `created_at`).
    pub fn delete_orders_before(&self, cutoff: &str) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM orders WHERE created_at < ?1", params![cutoff])?;
            Ok(deleted)
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn new_order(plate: &str) -> NewOrder {
        NewOrder {
            national_id: "12345678901".into(),
            id_serial: "A12B34567".into(),
            full_name: "Deniz Kaya".into(),
            phone: "05551234567".into(),
            registration_serial: "AB".into(),
            registration_no: "123456".into(),
            plate: plate.into(),
            brand: "Toyota".into(),
            model: "Corolla".into(),
            year: "2024".into(),
            provider: "AXA".into(),
            price: 1000,
        }
    }

    #[test]
    fn orders_start_pending_and_can_be_paid() {
        let db = Db::open_in_memory().unwrap();
        let order = db.insert_order(&new_order("34 ABC 123")).unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.price, 1000);

        assert!(db.set_order_status(order.id, PaymentStatus::Paid).unwrap());
        let paid = db.get_order(order.id).unwrap().unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert!(!db.set_order_status(999, PaymentStatus::Paid).unwrap());
    }

    #[test]
    fn price_beyond_sqlite_range_is_refused() {
        let db = Db::open_in_memory().unwrap();
        let mut order = new_order("34 MAX 99");
        order.price = u64::MAX;
        let err = db.insert_order(&order).unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange("price")));
        assert!(db.list_orders().unwrap().is_empty());
    }

    #[test]
    fn cleanup_only_touches_older_orders() {
        let db = Db::open_in_memory().unwrap();
        let old = db.insert_order(&new_order("06 OLD 01")).unwrap();
        let fresh = db.insert_order(&new_order("06 NEW 02")).unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE orders SET created_at = '2020-01-01T00:00:00.000000Z' WHERE id = ?1",
                params![old.id],
            )?;
            Ok(())
        })
        .unwrap();

        assert_eq!(db.delete_orders_before("2021-01-01T00:00:00.000000Z").unwrap(), 1);
        let left: Vec<i64> = db.list_orders().unwrap().iter().map(|o| o.id).collect();
        assert_eq!(left, vec![fresh.id]);
        assert!(db.delete_order(fresh.id).unwrap());
        assert!(!db.delete_order(fresh.id).unwrap());
    }
}
