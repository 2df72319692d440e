//! Ellen, the general mortgage guide.
//!
//! The guest overlay greets the visitor, collects a full name, then hands
//! every free-text message to the AI. The named variant is the full-page chat
//! for visitors whose name was collected beforehand; it skips straight to the
//! AI conversation.

use crate::chat::model::{AuthAction, FlowKind, Handoff, MessageSpec, ServiceType};
use crate::chat::table::{GUEST_CHOICE, Row, SIGNUP_CHOICE, TableBuilder, TransitionTable};

const GREETING: &str = "greeting";
const CONVERSATION: &str = "conversation";

fn guest_greeting(service: ServiceType) -> &'static str {
    match service {
        ServiceType::Homeowners => {
            "Hi, I'm Ellen — your friendly mortgage guide 😊 Ready to find your best fit for your new home?"
        }
        ServiceType::FirstTime => {
            "Hi, I'm Ellen! 😊 So exciting that you're looking to buy your first home. Let me help make this easy!"
        }
        ServiceType::Refinance => {
            "Hey there! I'm Ellen 😊 Looking to refinance? I'll help you find the best option."
        }
        ServiceType::Investment => {
            "Hi, I'm Ellen! 😊 Investing in property? Smart move. Let's find you the right mortgage."
        }
        ServiceType::Compare => {
            "Hi, I'm Ellen! 😊 Want to compare rates? I'll help you find the best deals."
        }
        _ => "Hi, I'm Ellen — your friendly mortgage guide 😊 Ready to find your best fit?",
    }
}

fn service_question(service: ServiceType) -> &'static str {
    match service {
        ServiceType::Homeowners => "Can I ask where your new home is located?",
        ServiceType::FirstTime => {
            "Is this your first home purchase? What type of property are you looking at?"
        }
        ServiceType::Refinance => {
            "Are you hoping to lower your monthly payments or shorten your loan term?"
        }
        ServiceType::Investment => {
            "Is this a personal or business investment? What's your budget range?"
        }
        ServiceType::Compare => "What loan amount are you considering?",
        _ => "What brings you here today? Are you looking to buy, refinance, or just explore options?",
    }
}

fn named_greeting(service: ServiceType) -> &'static str {
    match service {
        ServiceType::Purchase => {
            "Hi {{ firstName }}! 😊 I'm Ellen, your mortgage guide. I see you're looking to purchase a new home. I'll help you find the best rates and loan options. What's your budget range?"
        }
        ServiceType::Refinance => {
            "Hey {{ firstName }}! 😊 I'm Ellen. You're looking to refinance - smart move! Tell me about your current mortgage. What's your main goal: lower monthly payments or a shorter loan term?"
        }
        ServiceType::Investment => {
            "Hi {{ firstName }}! 😊 I'm Ellen. Investing in property is exciting! What type of investment property are you considering, and do you have expected rental income in mind?"
        }
        ServiceType::HomeEquity => {
            "Hey {{ firstName }}! 😊 I'm Ellen. Home equity loans can be great for accessing your home's value. What's the purpose of this loan, and how much equity do you think you have?"
        }
        ServiceType::Calculator => {
            "Hi {{ firstName }}! 😊 I'm Ellen. Let me help you calculate mortgage rates. What loan amount are you considering?"
        }
        _ => "Hi {{ firstName }}! 😊 I'm Ellen, your mortgage guide. How can I help you today?",
    }
}

/// Free text goes to the AI; the signup offer's buttons are handled locally.
fn ai_conversation(builder: TableBuilder) -> TableBuilder {
    builder
        .on_text_ai(CONVERSATION)
        .on_choice(
            CONVERSATION,
            SIGNUP_CHOICE,
            Row::to(CONVERSATION).defer(Handoff::Auth(AuthAction::CreateAccount)),
        )
        .on_choice(CONVERSATION, GUEST_CHOICE, Row::to(CONVERSATION))
}

/// Guest overlay for the given landing page.
pub fn guest(service: ServiceType) -> TransitionTable {
    let welcome = format!(
        "Nice to meet you, {{{{ firstName }}}}! {}",
        service_question(service)
    );
    let builder = TransitionTable::builder(FlowKind::Ellen(service), GREETING)
        .opening(MessageSpec::say(guest_greeting(service)))
        .on_text(
            GREETING,
            Row::to(CONVERSATION)
                .capture_name()
                .say(MessageSpec::say(welcome)),
        );
    ai_conversation(builder).build()
}

/// Full-page chat for a visitor whose first name is already known.
pub fn named(service: ServiceType) -> TransitionTable {
    let builder = TransitionTable::builder(FlowKind::EllenNamed(service), CONVERSATION)
        .opening(MessageSpec::say(named_greeting(service)));
    ai_conversation(builder).build()
}
