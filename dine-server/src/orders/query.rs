//! Read-side order views
//!
//! Reads never take the write lock. Lines are resolved against the menu
//! catalog for display; a hard-deleted or archived menu item only changes
//! the label, never the stored price or quantity.

use super::error::{OrderError, OrderResult};
use crate::storage::DineStorage;
use crate::tables::TableError;
use shared::models::{
    DashboardStats, MenuItem, Order, OrderDetail, OrderItemView, OrderStatus,
};
use std::collections::HashMap;

/// Order lookups for diners, staff and the dashboard
#[derive(Clone)]
pub struct OrderQueries {
    storage: DineStorage,
}

impl std::fmt::Debug for OrderQueries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderQueries").finish_non_exhaustive()
    }
}

impl OrderQueries {
    pub fn new(storage: DineStorage) -> Self {
        Self { storage }
    }

    /// One order with its lines
    pub fn get_order(&self, order_id: &str) -> OrderResult<OrderDetail> {
        let order = self
            .storage
            .get_order(order_id)?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;
        let menu = self.menu_index()?;
        self.detail(order, &menu)
    }

    /// Every order, newest first
    pub fn list_orders(&self) -> OrderResult<Vec<OrderDetail>> {
        self.details_where(|_| true)
    }

    /// Paid orders, newest first
    pub fn paid_orders(&self) -> OrderResult<Vec<OrderDetail>> {
        self.details_where(|o| o.status == OrderStatus::Paid)
    }

    /// Newest order of the table that is neither paid nor cancelled
    pub fn recent_order_for_table(&self, table_number: i32) -> OrderResult<Option<OrderDetail>> {
        if self.storage.get_table(table_number)?.is_none() {
            return Err(TableError::NotFound(table_number).into());
        }

        let recent = self
            .sorted_orders()?
            .into_iter()
            .find(|o| o.table_number == table_number && !o.status.is_terminal());

        match recent {
            Some(order) => {
                let menu = self.menu_index()?;
                Ok(Some(self.detail(order, &menu)?))
            }
            None => Ok(None),
        }
    }

    /// Dashboard counters
    pub fn stats(&self) -> OrderResult<DashboardStats> {
        let orders = self.storage.list_orders()?;
        let active_tables = self
            .storage
            .list_tables()?
            .iter()
            .filter(|t| t.status.has_open_session())
            .count();

        let paid: Vec<&Order> = orders
            .iter()
            .filter(|o| o.status == OrderStatus::Paid)
            .collect();
        let revenue = shared::money::to_f64(
            paid.iter()
                .map(|o| shared::money::to_decimal(o.total_amount))
                .sum(),
        );

        Ok(DashboardStats {
            active_tables,
            pending_orders: orders
                .iter()
                .filter(|o| o.status == OrderStatus::Pending)
                .count(),
            paid_orders: paid.len(),
            revenue,
        })
    }

    fn details_where<F>(&self, keep: F) -> OrderResult<Vec<OrderDetail>>
    where
        F: Fn(&Order) -> bool,
    {
        let menu = self.menu_index()?;
        self.sorted_orders()?
            .into_iter()
            .filter(|o| keep(o))
            .map(|o| self.detail(o, &menu))
            .collect()
    }

    fn sorted_orders(&self) -> OrderResult<Vec<Order>> {
        let mut orders = self.storage.list_orders()?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(orders)
    }

    fn menu_index(&self) -> OrderResult<HashMap<String, MenuItem>> {
        Ok(self
            .storage
            .list_menu_items()?
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect())
    }

    fn detail(&self, order: Order, menu: &HashMap<String, MenuItem>) -> OrderResult<OrderDetail> {
        let items = self
            .storage
            .items_for_order(&order.id)?
            .into_iter()
            .map(|item| {
                let menu_item = menu.get(&item.menu_item_id);
                OrderItemView::resolve(item, menu_item)
            })
            .collect();
        Ok(OrderDetail { order, items })
    }
}
