use signchat::application_impl::RealChatService;
use signchat::application_port::*;
use signchat::domain_model::*;
use signchat::infra_memory::MemoryGateway;
use signchat::presentation::MessageThread;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

const ANN: UserId = UserId(Uuid::from_u128(0xa));
const BOB: UserId = UserId(Uuid::from_u128(0xb));
const CAT: UserId = UserId(Uuid::from_u128(0xc));

fn setup() -> (Arc<MemoryGateway>, RealChatService) {
    let gateway = Arc::new(MemoryGateway::default());
    gateway.register_user(ANN, "Ann");
    gateway.register_user(BOB, "Bob");
    gateway.register_user(CAT, "Cat");
    let service = RealChatService::new(
        gateway.clone(),
        gateway.clone(),
        gateway.clone(),
        gateway.clone(),
        gateway.clone(),
    );
    (gateway, service)
}

async fn send(service: &RealChatService, chat: ChatId, from: UserId, text: &str) -> Message {
    let message = service
        .send_message(NewMessage::text(chat, from, text))
        .await
        .unwrap();
    service.update_last_message_time(chat).await.unwrap();
    message
}

#[tokio::test]
async fn chats_are_listed_by_latest_activity() {
    let (_, service) = setup();
    let first = service.create_chat(&[ANN, BOB], false).await.unwrap();
    let second = service.create_chat(&[ANN, CAT], false).await.unwrap();
    let idle = service.create_chat(&[ANN, BOB, CAT], true).await.unwrap();

    send(&service, first.id, ANN, "one").await;
    send(&service, second.id, ANN, "two").await;
    send(&service, first.id, BOB, "three").await;

    let order: Vec<ChatId> = service
        .list_chats()
        .await
        .unwrap()
        .iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(order, vec![first.id, second.id, idle.id]);
}

#[tokio::test]
async fn messages_are_listed_oldest_first() {
    let (_, service) = setup();
    let chat = service.create_chat(&[ANN, BOB], false).await.unwrap();
    for n in 0..10 {
        let from = if n % 2 == 0 { ANN } else { BOB };
        send(&service, chat.id, from, &format!("m{n}")).await;
    }

    let messages = service.list_messages(chat.id).await.unwrap();
    assert_eq!(messages.len(), 10);
    assert!(messages.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents[0], "m0");
    assert_eq!(contents[9], "m9");
    assert_eq!(messages[1].sender_name(), Some("Bob"));
}

#[tokio::test]
async fn marking_read_twice_matches_marking_once() {
    let (gateway, service) = setup();
    let chat = service.create_chat(&[ANN, BOB], false).await.unwrap();
    send(&service, chat.id, ANN, "a").await;
    send(&service, chat.id, ANN, "b").await;
    let messages = service.list_messages(chat.id).await.unwrap();

    service.mark_messages_as_read(&messages, BOB).await.unwrap();
    let mut once = gateway.read_statuses();
    service.mark_messages_as_read(&messages, BOB).await.unwrap();
    let mut twice = gateway.read_statuses();

    let keys = |rows: &mut Vec<MessageReadStatus>| {
        rows.sort_by_key(MessageReadStatus::key);
        rows.iter().map(|s| (s.key(), s.is_read)).collect::<Vec<_>>()
    };
    assert_eq!(once.len(), 2);
    assert_eq!(keys(&mut once), keys(&mut twice));
}

#[tokio::test]
async fn own_messages_are_never_marked() {
    let (gateway, service) = setup();
    let chat = service.create_chat(&[ANN, BOB, CAT], true).await.unwrap();
    send(&service, chat.id, ANN, "from ann").await;
    send(&service, chat.id, BOB, "from bob").await;
    let messages = service.list_messages(chat.id).await.unwrap();

    let marked = service.mark_messages_as_read(&messages, BOB).await.unwrap();

    assert_eq!(marked, 1);
    let statuses = gateway.read_statuses();
    let own = messages.iter().find(|m| m.sender_id == BOB).unwrap();
    assert!(statuses.iter().all(|s| s.message_id != own.id));
}

#[tokio::test]
async fn touch_never_precedes_the_sent_message() {
    let (_, service) = setup();
    let chat = service.create_chat(&[ANN, BOB], false).await.unwrap();

    for text in ["x", "y", "z"] {
        let sent = send(&service, chat.id, ANN, text).await;
        let chats = service.list_chats().await.unwrap();
        let last = chats[0].last_message_at.unwrap();
        assert!(last >= sent.created_at);
    }
}

#[tokio::test]
async fn repeated_uploads_get_distinct_urls() {
    let (gateway, service) = setup();
    let attachment = Attachment::new("sign.mp4", vec![0u8; 64]);

    let mut urls = Vec::new();
    for _ in 0..5 {
        urls.push(service.upload_attachment(&attachment, ANN).await.unwrap());
    }

    let mut unique = urls.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), urls.len());
    assert_eq!(gateway.calls("storage.upload"), 5);
}

#[tokio::test]
async fn ann_says_hi_and_bob_reads_it() {
    let (gateway, service) = setup();
    let c1 = service.create_chat(&[ANN, BOB], false).await.unwrap();

    let sent = send(&service, c1.id, ANN, "hi").await;

    let messages = service.list_messages(c1.id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "hi");
    assert_eq!(messages[0].sender_id, ANN);

    service.mark_messages_as_read(&messages, BOB).await.unwrap();

    let receipts = service.read_receipts(&[sent.id]).await.unwrap();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].user_id, BOB);
    assert!(receipts[0].is_read);
    assert!(gateway.read_statuses().iter().all(|s| s.user_id != ANN));
}

#[tokio::test]
async fn realtime_echo_collapses_with_sent_row() {
    let (_, service) = setup();
    let chat = service.create_chat(&[ANN, BOB], false).await.unwrap();
    let other = service.create_chat(&[ANN, CAT], false).await.unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = service
        .subscribe_to_messages(
            chat.id,
            Box::new(move |message| {
                let _ = tx.send(message);
            }),
        )
        .await
        .unwrap();

    let mut thread = MessageThread::new(chat.id);
    thread.extend_history(service.list_messages(chat.id).await.unwrap());
    let sent = send(&service, chat.id, ANN, "hello").await;
    send(&service, other.id, ANN, "elsewhere").await;
    assert!(thread.push(sent.clone()));

    let echo = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(echo.id, sent.id);
    assert!(!thread.push(echo));
    assert_eq!(thread.len(), 1);

    subscription.unsubscribe().await;
    assert!(rx.recv().await.is_none());
}
