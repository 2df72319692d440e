//! The scripted conversations, one transition table per loan category.
//!
//! Scripts are data. Each category keeps its own step graph, including the
//! places where categories word or route similar questions differently.

pub mod ellen;
pub mod first_time_buyer;
pub mod government_backed;
pub mod jumbo;

use crate::chat::model::{FlowKind, ServiceType};
use crate::chat::table::TransitionTable;

/// Build the transition table for a flow.
pub fn table_for(flow: &FlowKind) -> TransitionTable {
    match *flow {
        FlowKind::Ellen(service) => ellen::guest(service),
        FlowKind::EllenNamed(service) => ellen::named(service),
        FlowKind::FirstTimeBuyer => first_time_buyer::table(),
        FlowKind::GovernmentBacked => government_backed::table(),
        FlowKind::Jumbo => jumbo::table(),
    }
}

const SERVICES: [ServiceType; 9] = [
    ServiceType::Homeowners,
    ServiceType::FirstTime,
    ServiceType::Refinance,
    ServiceType::Investment,
    ServiceType::Compare,
    ServiceType::Purchase,
    ServiceType::HomeEquity,
    ServiceType::Calculator,
    ServiceType::Default,
];

/// Every flow the catalog can serve.
pub fn all_flows() -> Vec<FlowKind> {
    SERVICES
        .iter()
        .map(|s| FlowKind::Ellen(*s))
        .chain(SERVICES.iter().map(|s| FlowKind::EllenNamed(*s)))
        .chain([
            FlowKind::FirstTimeBuyer,
            FlowKind::GovernmentBacked,
            FlowKind::Jumbo,
        ])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::state::StepId;

    #[test]
    fn every_table_is_free_of_dead_ends() {
        for flow in all_flows() {
            let table = table_for(&flow);
            assert_eq!(table.flow, flow);
            let problems = table.validate();
            assert!(problems.is_empty(), "{flow}: {problems:?}");
        }
    }

    #[test]
    fn initial_steps() {
        assert_eq!(table_for(&FlowKind::FirstTimeBuyer).initial_step, "welcome");
        assert_eq!(table_for(&FlowKind::GovernmentBacked).initial_step, "greeting");
        assert_eq!(table_for(&FlowKind::Jumbo).initial_step, "greeting");
        assert_eq!(
            table_for(&FlowKind::Ellen(ServiceType::Refinance)).initial_step,
            "greeting"
        );
    }

    #[test]
    fn category_step_graphs() {
        let ftb = table_for(&FlowKind::FirstTimeBuyer).reachable_steps();
        for step in [
            "property_interest",
            "budget_input",
            "credit_score_help",
            "down_payment_assistance",
            "login_required",
            "wrap_up",
            "end",
        ] {
            assert!(ftb.contains(&StepId::from(step)), "first-time buyer missing {step}");
        }

        let gov = table_for(&FlowKind::GovernmentBacked).reachable_steps();
        for step in [
            "fha_credit_score",
            "va_coe_help",
            "usda_zip_check",
            "condo_approval",
            "down_payment_input",
            "rough_estimate",
            "wrap_up",
        ] {
            assert!(gov.contains(&StepId::from(step)), "government-backed missing {step}");
        }

        let jumbo = table_for(&FlowKind::Jumbo).reachable_steps();
        for step in [
            "redirect_service",
            "conventional_option",
            "budget_estimate_ready",
            "property_secondary",
            "rate_compare",
            "summary_save",
            "email_input",
        ] {
            assert!(jumbo.contains(&StepId::from(step)), "jumbo missing {step}");
        }
    }

    #[test]
    fn catalog_covers_every_service_twice() {
        let flows = all_flows();
        assert_eq!(flows.len(), 2 * SERVICES.len() + 3);
    }
}
