//! Read-only portfolio view.

use crate::domain::exposure::PortfolioSnapshot;

pub trait PortfolioPort {
    fn snapshot(&self) -> PortfolioSnapshot;
}
