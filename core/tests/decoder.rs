use spectator_core::{
    decode_message, DecodeError, Envelope, Loc, Signal, Team, UnitId, Value,
};

fn decode(raw: &str) -> Envelope {
    decode_message(raw)
        .expect("message decodes")
        .expect("message type is tracked")
}

fn round_signals(raw: &str) -> Vec<Signal> {
    match decode(raw) {
        Envelope::Round(round) => round.signals,
        other => panic!("expected round, got {other:?}"),
    }
}

#[test]
fn decodes_header_with_origin_and_layers() {
    let envelope = decode(
        r#"{"MessageType":"Header","Data":{"Map":{
            "Width":3,"Height":2,"Name":"arena","Origin":"100,200",
            "InitialRubble":[["0,10,0"],["0,0,250"]],
            "InitialParts":[["0,0,0"],["30,0,0"]]}}}"#,
    );

    let Envelope::Header(header) = envelope else {
        panic!("expected header");
    };
    assert_eq!(header.map.width, 3);
    assert_eq!(header.map.height, 2);
    assert_eq!(header.map.name, "arena");
    assert_eq!(header.map.origin, Loc::new(100.0, 200.0));
    assert_eq!(header.map.initial_rubble[1][2], 250.0);
    assert_eq!(header.map.initial_parts[1][0], 30.0);
}

#[test]
fn header_layers_must_match_dimensions() {
    let result = decode_message(
        r#"{"MessageType":"Header","Data":{"Map":{
            "Width":3,"Height":2,"Origin":"0,0",
            "InitialRubble":[["0,0,0"]],
            "InitialParts":[["0,0,0"],["0,0,0"]]}}}"#,
    );
    assert!(matches!(result, Err(DecodeError::LayerShape { layer: "InitialRubble", .. })));
}

#[test]
fn header_missing_map_is_a_payload_error() {
    let result = decode_message(r#"{"MessageType":"Header","Data":{}}"#);
    assert!(matches!(result, Err(DecodeError::Payload { kind: "Header", .. })));
}

#[test]
fn decodes_stored_constants_and_archetypes() {
    let envelope = decode(
        r#"{"MessageType":"StoredConstants","Data":{
            "GameConstants":[
                {"Name":"RUBBLE_OBSTRUCTION_THRESH","Value":{"Data":"100","XMLName":{"Local":"int"}}},
                {"Name":"PART_INCOME","Value":{"Data":"2.5","XMLName":{"Local":"double"}}}
            ],
            "RobotTypes":[
                {"Name":"SOLDIER","Params":[
                    {"Name":"maxHealth","Value":{"Data":"60","XMLName":{"Local":"double"}}},
                    {"Name":"spawnSource","Value":{"Data":"ARCHON","XMLName":{"Local":"battlecode.common.RobotType"}}}
                ]}
            ]}}"#,
    );

    let Envelope::StoredConstants(stored) = envelope else {
        panic!("expected stored constants");
    };
    assert_eq!(stored.constants.number("RUBBLE_OBSTRUCTION_THRESH"), Some(100.0));
    assert_eq!(stored.constants.get("PART_INCOME"), Some(&Value::Double(2.5)));

    let soldier = stored.catalog.get("SOLDIER").expect("soldier archetype");
    assert_eq!(soldier.max_health(), Some(60.0));
    assert_eq!(
        soldier.param("spawnSource").and_then(Value::as_str),
        Some("ARCHON")
    );
}

#[test]
fn unknown_message_types_are_ignored() {
    let decoded = decode_message(r#"{"MessageType":"Replay2030","Data":{"Anything":1}}"#)
        .expect("unknown message types are not errors");
    assert!(decoded.is_none());
}

#[test]
fn malformed_envelopes_are_errors() {
    assert!(matches!(decode_message("not json"), Err(DecodeError::Envelope(_))));
    assert!(matches!(
        decode_message(r#"{"Data":{}}"#),
        Err(DecodeError::Envelope(_))
    ));
}

#[test]
fn round_without_signals_decodes_to_empty_round() {
    assert!(round_signals(r#"{"MessageType":"Round","Data":{"Signals":null}}"#).is_empty());
    assert!(round_signals(r#"{"MessageType":"Round","Data":{}}"#).is_empty());
    assert!(round_signals(r#"{"MessageType":"Round","Data":{"Signals":[]}}"#).is_empty());
}

#[test]
fn decodes_every_recognized_signal() {
    let signals = round_signals(
        r#"{"MessageType":"Round","Data":{"Signals":[
            {"XMLName":{"Local":"sig.SpawnSignal"},"RobotId":7,"ParentId":2,"Loc":"3,4","Type":"SOLDIER","Team":"A","Delay":1},
            {"XMLName":{"Local":"sig.MovementSignal"},"RobotId":7,"NewLoc":"4,4","Delay":2},
            {"XMLName":{"Local":"sig.AttackSignal"},"RobotId":7,"TargetLoc":"5,5"},
            {"XMLName":{"Local":"sig.HealthChangeSignal"},"RobotIds":"7,8","Health":"12.5,3"},
            {"XMLName":{"Local":"sig.ClearRubbleSignal"},"RobotId":7,"Loc":"4,5","Delay":3},
            {"XMLName":{"Local":"sig.RubbleChangeSignal"},"Loc":"4,5","Amount":40},
            {"XMLName":{"Local":"sig.PartsChangeSignal"},"Loc":"1,1","Amount":0.5},
            {"XMLName":{"Local":"sig.BroadcastSignal"},"RobotId":7,"Component":{"Location":"4,4"},"Radius":"9"},
            {"XMLName":{"Local":"sig.DeathSignal"},"ObjectId":7},
            {"XMLName":{"Local":"sig.IndicatorStringSignal"},"RobotId":7,"StringIndex":0,"NewString":"hi"},
            {"XMLName":{"Local":"sig.InfectionSignal"}},
            {"XMLName":{"Local":"sig.TeamResourceSignal"}},
            {"XMLName":{"Local":"sig.BytecodesUsedSignal"}},
            {"XMLName":{"Local":"sig.RobotDelaySignal"}}
        ]}}"#,
    );

    assert_eq!(signals.len(), 14);

    let Signal::Spawn(spawn) = &signals[0] else {
        panic!("expected spawn");
    };
    assert_eq!(spawn.robot_id, UnitId::new(7));
    assert_eq!(spawn.parent_id, Some(UnitId::new(2)));
    assert_eq!(spawn.loc, Loc::new(3.0, 4.0));
    assert_eq!(spawn.kind, "SOLDIER");
    assert_eq!(spawn.team, Team::A);

    let Signal::Movement(movement) = &signals[1] else {
        panic!("expected movement");
    };
    assert_eq!(movement.new_loc, Loc::new(4.0, 4.0));
    assert_eq!(movement.delay, 2);

    let Signal::HealthChange(health) = &signals[3] else {
        panic!("expected health change");
    };
    assert_eq!(health.robot_ids, vec![UnitId::new(7), UnitId::new(8)]);
    assert_eq!(health.health, vec![12.5, 3.0]);

    let Signal::Broadcast(broadcast) = &signals[7] else {
        panic!("expected broadcast");
    };
    assert_eq!(broadcast.location(), Loc::new(4.0, 4.0));
    assert_eq!(broadcast.radius, 9.0);

    let Signal::Death(death) = &signals[8] else {
        panic!("expected death");
    };
    assert_eq!(death.object_id, UnitId::new(7));

    assert_eq!(signals[9], Signal::IndicatorString);
    assert_eq!(signals[13], Signal::RobotDelay);
}

#[test]
fn unknown_signal_tags_decode_to_unrecognized() {
    let signals = round_signals(
        r#"{"MessageType":"Round","Data":{"Signals":[
            {"XMLName":{"Local":"sig.TeleportSignal"},"RobotId":1}
        ]}}"#,
    );
    assert_eq!(
        signals,
        vec![Signal::Unrecognized {
            tag: "sig.TeleportSignal".to_owned()
        }]
    );
}

#[test]
fn recognized_signal_missing_fields_fails_whole_message() {
    let result = decode_message(
        r#"{"MessageType":"Round","Data":{"Signals":[
            {"XMLName":{"Local":"sig.MovementSignal"},"RobotId":1}
        ]}}"#,
    );
    assert!(matches!(
        result,
        Err(DecodeError::Signal { ref tag, .. }) if tag == "sig.MovementSignal"
    ));
}

#[test]
fn malformed_location_fails_whole_message() {
    let result = decode_message(
        r#"{"MessageType":"Round","Data":{"Signals":[
            {"XMLName":{"Local":"sig.AttackSignal"},"RobotId":1,"TargetLoc":"nowhere"}
        ]}}"#,
    );
    assert!(result.is_err());
}

#[test]
fn decodes_match_summary_messages() {
    let Envelope::Metadata(metadata) = decode(
        r#"{"MessageType":"Metadata","Data":{"Type":"bc16","TeamA":"red","TeamB":"blue","Maps":"arena"}}"#,
    ) else {
        panic!("expected metadata");
    };
    assert_eq!(metadata.team_a, "red");
    assert_eq!(metadata.team_b, "blue");

    let Envelope::Footer(footer) = decode(r#"{"MessageType":"Footer","Data":{"Winner":"B"}}"#)
    else {
        panic!("expected footer");
    };
    assert_eq!(footer.winner, "B");

    let Envelope::GameStats(stats) =
        decode(r#"{"MessageType":"GameStats","Data":{"DominationFactor":"PWNED"}}"#)
    else {
        panic!("expected game stats");
    };
    assert_eq!(stats.domination_factor, "PWNED");
}
