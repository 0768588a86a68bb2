//! Pipeline behaviour tests with recording collaborators.

mod query_flow;
