// My query building system, it's only doing SELECTs
// now. Everything that writes is plain SQL in the
// other modules.

use std::fmt;

pub enum Order {
  Asc,
  Desc
}

pub struct OrderBy {
  pub order: Order,
  pub field: String
}

impl OrderBy {
  pub fn new(order: Order, field: &str) -> Self {
    OrderBy {
      order,
      field: field.to_string()
    }
  }
}

// Decided to use the "builder pattern"
// they talk about in Rust docs for
// query building.
// The "q_" in front of field names is
// just because "where" is a reserved
// keyword in Rust.
// WHERE clauses are always glued together
// with AND, put parentheses in a clause if
// you need an OR.
pub struct Query {
  q_fields: Vec<String>,
  q_from: String,
  q_where: Vec<String>,
  q_order: Vec<OrderBy>,
  limit: Option<usize>,
  offset: Option<usize>
}

impl Query {

  pub fn select(fields: &[&str], from: &str) -> Self {
    Query {
      q_fields: fields.iter().map(|f| f.to_string()).collect(),
      q_from: from.to_string(),
      q_where: Vec::new(),
      q_order: Vec::new(),
      limit: None,
      offset: None
    }
  }

  pub fn where_and(mut self, clause: String) -> Self {
    self.q_where.push(clause);
    self
  }

  pub fn order(mut self, order: OrderBy) -> Self {
    self.q_order.push(order);
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  pub fn offset(mut self, offset: usize) -> Self {
    self.offset = Some(offset);
    self
  }

  // Same query with count(*) as only field and without
  // the ordering and limits, for the pagination.
  pub fn count(&self) -> Query {
    Query {
      q_fields: vec![String::from("count(*)")],
      q_from: self.q_from.clone(),
      q_where: self.q_where.clone(),
      q_order: Vec::new(),
      limit: None,
      offset: None
    }
  }

}

// Creating the query string is done by implementing
// the Display trait, which gives us to_string().
impl fmt::Display for Query {

  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "SELECT {} FROM {}", self.q_fields.join(", "), self.q_from)?;
    if !self.q_where.is_empty() {
      write!(f, " WHERE {}", self.q_where.join(" AND "))?;
    }
    if !self.q_order.is_empty() {
      let orders: Vec<String> = self.q_order.iter()
        .map(|o| format!(
          "{} {}",
          o.field,
          match o.order {
            Order::Asc => "ASC",
            Order::Desc => "DESC"
          }
        ))
        .collect();
      write!(f, " ORDER BY {}", orders.join(", "))?;
    }
    // SQLite doesn't allow OFFSET without LIMIT.
    if let Some(lim) = self.limit {
      write!(f, " LIMIT {}", lim)?;
      if let Some(off) = self.offset {
        write!(f, " OFFSET {}", off)?;
      }
    }
    Ok(())
  }

}
