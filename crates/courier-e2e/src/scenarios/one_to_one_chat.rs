//! One-to-one chat scenario
//!
//! Two fresh accounts exchange a message in each direction.

use courier_harness::{ActorId, HarnessResult, Observable, Scenario, Text};

use crate::actions::{AddContact, CreateUser, GoHome, OpenChat, ReadPublicKey, SendMessage};

pub const NAME: &str = "one_to_one_chat";

pub const FIRST_MESSAGE: &str = "SOMETHING";
pub const REPLY: &str = "another SOMETHING";

pub fn scenario() -> HarnessResult<Scenario> {
    let (d1, d2) = (ActorId(0), ActorId(1));

    Scenario::builder(NAME)
        .description("device_2 adds device_1 by public key; both sides send and receive")
        .tag("chat")
        .actor("contact")
        .actor("initiator")
        .step(d1, "create user", CreateUser)
        .step(d2, "create user", CreateUser)
        .step(d1, "read public key", ReadPublicKey::into_var("contact_key"))
        .step(d2, "add device_1 as contact", AddContact::new(Text::var("contact_key")))
        .step(d2, "send first message", SendMessage::new(FIRST_MESSAGE))
        .step(d1, "go home", GoHome)
        .expect(Observable::text_on(d1, FIRST_MESSAGE))
        .step(d1, "open chat from its last message", OpenChat::named(FIRST_MESSAGE))
        .step(d1, "reply", SendMessage::new(REPLY))
        .expect(Observable::text_on(d2, REPLY))
        .build()
}
