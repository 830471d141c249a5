use std::time::{Duration, Instant};

use carconsole::{
    CarInput, ClientMessage, ConnectionId, Delivery, Gateway, GameOver, LobbyInfo, Pedal,
    PedalInput, PhysicsConfig, RoomCode, RoomRegistry, RoundPhase, ScreenSession, ServerMessage,
    Steer, Winner,
};

const SCREEN: ConnectionId = 1;
const ALICE: ConnectionId = 2;
const BOB: ConnectionId = 3;
const CAROL: ConnectionId = 4;

fn messages_for(deliveries: &[Delivery], to: ConnectionId) -> Vec<ServerMessage> {
    deliveries
        .iter()
        .filter(|d| d.to == to)
        .map(|d| d.message.clone())
        .collect()
}

fn host(gateway: &mut Gateway) -> RoomCode {
    gateway.connect(SCREEN);
    let out = gateway.handle(SCREEN, ClientMessage::CreateRoom);
    match messages_for(&out, SCREEN).as_slice() {
        [ServerMessage::RoomCreated(code)] => code.clone(),
        other => panic!("unexpected reply: {:?}", other),
    }
}

/// Feeds whatever the screen received into its session.
fn pump(session: &mut ScreenSession, deliveries: &[Delivery], now: Instant) {
    for message in messages_for(deliveries, SCREEN) {
        session.apply(message, now);
    }
}

#[test]
fn test_full_versus_round_through_gateway() {
    let start = Instant::now();
    let mut gateway = Gateway::new(RoomRegistry::with_seed(2, 11));
    let mut session = ScreenSession::with_seed(PhysicsConfig::default(), 2, 5);

    let code = host(&mut gateway);
    session.apply(ServerMessage::RoomCreated(code.clone()), start);

    for conn in [ALICE, BOB] {
        gateway.connect(conn);
        let out = gateway.handle(conn, ClientMessage::JoinRoom(code.as_str().to_lowercase()));
        pump(&mut session, &out, start);
    }
    assert_eq!(session.phase(), RoundPhase::Running);

    // a third controller is turned away and nothing changes
    gateway.connect(CAROL);
    let out = gateway.handle(CAROL, ClientMessage::JoinRoom(code.to_string()));
    assert_eq!(out, vec![Delivery {
        to: CAROL,
        message: ServerMessage::error("Room is full"),
    }]);
    assert_eq!(gateway.registry().get(&code).unwrap().controller_count(), 2);

    let out = gateway.handle(ALICE, ClientMessage::PedalInput(PedalInput::new(Pedal::Gas, true)));
    assert_eq!(
        messages_for(&out, SCREEN),
        vec![ServerMessage::PedalInput(PedalInput {
            pedal: Pedal::Gas,
            is_down: true,
            player_index: Some(0),
        })]
    );
    pump(&mut session, &out, start);

    let mut game_over = None;
    let mut now = start;
    while game_over.is_none() && now < start + Duration::from_secs(120) {
        now += Duration::from_millis(16);
        game_over = session.frame(now);
    }
    let game_over = game_over.expect("round should end");
    let ClientMessage::GameOver(GameOver { winner }) = &game_over else {
        panic!("expected game over, got {:?}", game_over);
    };
    // Bob never touched the pedals and fell behind the camera
    assert!(session.round().unwrap().car(1).unwrap().crashed);
    assert_eq!(*winner, Some(decided(&session)));

    let out = gateway.handle(SCREEN, game_over.clone());
    for conn in [SCREEN, ALICE, BOB] {
        assert!(matches!(
            messages_for(&out, conn).as_slice(),
            [ServerMessage::GameOver(_)]
        ));
    }

    let out = gateway.handle(BOB, ClientMessage::RestartGame);
    pump(&mut session, &out, now);
    assert_eq!(session.phase(), RoundPhase::Running);
}

fn decided(session: &ScreenSession) -> Winner {
    carconsole::physics::decide_winner(session.round().unwrap().players())
}

#[test]
fn test_controller_drop_and_rejoin_reuses_index() {
    let now = Instant::now();
    let mut gateway = Gateway::new(RoomRegistry::with_seed(2, 11));
    let mut session = ScreenSession::with_seed(PhysicsConfig::default(), 2, 5);
    let code = host(&mut gateway);

    for conn in [ALICE, BOB] {
        gateway.connect(conn);
        let out = gateway.handle(conn, ClientMessage::JoinRoom(code.to_string()));
        pump(&mut session, &out, now);
    }

    let out = gateway.disconnect(ALICE);
    assert_eq!(
        messages_for(&out, BOB),
        vec![ServerMessage::LobbyUpdate(LobbyInfo {
            player_index: None,
            total_players: 1,
            room_code: Some(code.clone()),
        })]
    );
    pump(&mut session, &out, now);
    assert_eq!(session.roster().collect::<Vec<_>>(), vec![1]);

    gateway.connect(CAROL);
    let out = gateway.handle(CAROL, ClientMessage::JoinRoom(code.to_string()));
    assert!(matches!(
        messages_for(&out, CAROL).first(),
        Some(ServerMessage::JoinedRoom(joined)) if joined.player_index == 0
    ));

    // steering from the new controller lands in slot 0
    pump(&mut session, &out, now);
    session.apply(ServerMessage::RestartGame, now);
    let out = gateway.handle(CAROL, ClientMessage::CarInput(CarInput::new(Steer::Left)));
    pump(&mut session, &out, now);
    let round = session.round().unwrap();
    assert_eq!(round.mailbox(0).unwrap().peek().steer, Steer::Left);
}

#[test]
fn test_screen_leaving_closes_room_for_everyone() {
    let now = Instant::now();
    let mut gateway = Gateway::new(RoomRegistry::with_seed(2, 11));
    let code = host(&mut gateway);

    gateway.connect(ALICE);
    gateway.handle(ALICE, ClientMessage::JoinRoom(code.to_string()));

    let out = gateway.disconnect(SCREEN);
    assert_eq!(messages_for(&out, ALICE), vec![ServerMessage::RoomClosed]);
    assert!(!gateway.registry().contains(&code));

    // the controller's own disconnect afterwards is harmless
    assert!(gateway.disconnect(ALICE).is_empty());
    assert!(gateway.disconnect(SCREEN).is_empty());

    let mut late = ScreenSession::default();
    late.apply(ServerMessage::RoomClosed, now);
    assert!(late.is_closed());
}
