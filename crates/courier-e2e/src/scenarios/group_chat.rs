//! Group chat scenario
//!
//! A group of two exchanges messages, then the creator removes the other
//! member, who must stop receiving group messages.

use courier_harness::{ActorId, Back, ElementKind, HarnessResult, Observable, Scenario, Target, Text};

use crate::actions::{
    AddContact, CaptureChatName, CreateGroupChat, CreateUser, GoHome, OpenChat, ReadPublicKey, RemoveMember,
    SendMessage, WaitFor,
};

pub const NAME: &str = "group_chat_send_receive_messages_and_remove_user";

pub const CHAT_NAME: &str = "new_chat";
pub const FIRST_MESSAGE: &str = "first SOMETHING";
pub const SECOND_MESSAGE: &str = "second SOMETHING";
pub const AFTER_REMOVAL: &str = "third SOMETHING";
pub const REMOVED_NOTICE: &str = "removed you from group chat";

pub fn scenario() -> HarnessResult<Scenario> {
    let (d1, d2) = (ActorId(0), ActorId(1));

    Scenario::builder(NAME)
        .description("device_2 creates a group with device_1, both chat, then device_1 is removed")
        .tag("chat")
        .actor("member")
        .actor("admin")
        .step(d1, "create user", CreateUser)
        .step(d2, "create user", CreateUser)
        .step(d1, "read public key", ReadPublicKey::into_var("member_key"))
        .step(d2, "add device_1 as contact", AddContact::new(Text::var("member_key")))
        .step(d2, "read device_1 name", CaptureChatName::into_var("member_name"))
        .step(d2, "back to chat list", Back::times(3))
        .step(
            d2,
            "create group chat",
            CreateGroupChat::new(vec![Text::var("member_name")], CHAT_NAME),
        )
        .step(d2, "send first message", SendMessage::new(FIRST_MESSAGE))
        .step(d1, "go home", GoHome)
        .expect(Observable::text_on(d1, FIRST_MESSAGE))
        .step(d1, "open group chat", OpenChat::named(CHAT_NAME))
        .step(d1, "send second message", SendMessage::new(SECOND_MESSAGE))
        .expect(Observable::text_on(d2, SECOND_MESSAGE))
        .step(d2, "remove device_1", RemoveMember)
        .step(d2, "send message after removal", SendMessage::new(AFTER_REMOVAL))
        .step(
            d1,
            "see removal notice",
            WaitFor::new(Target::text_part(ElementKind::Any, REMOVED_NOTICE)),
        )
        .expect(Observable::stays_absent(
            d1,
            Target::text(ElementKind::Text, AFTER_REMOVAL),
        ))
        .build()
}
