//! End-to-end scenarios for the planners and the engine.

use fleet_core::prelude::*;
use fleet_core::strategy::PlanContext;
use fleet_test_utils::fixtures::{tick_input, unit, Scenario, ENEMY, ME};

fn small_world() -> WorldState {
    // Side 16: a 4x4 fine grid of 4-unit cells
    let rules = GameRules {
        world_width: 16.0,
        world_height: 16.0,
        ..GameRules::default()
    };
    let constants = RuntimeConstants::new(&rules).expect("valid rules");
    WorldState::new(constants, &EngineConfig::default())
}

fn me(cooldown: u64) -> PlayerState {
    PlayerState {
        id: ME,
        score: 0,
        strike_cooldown_ticks: cooldown,
    }
}

#[test]
fn test_richest_cell_of_four_by_four_grid_is_targeted() {
    let mut world = small_world();
    assert_eq!(world.constants.grid.cells_per_side, 4);

    // Twelve enemies worth +40 in cell (2, 1): ten healthy, two badly damaged
    let mut id = 0;
    for x in [8.5, 9.5, 10.5, 11.5] {
        for y in [4.5, 5.5, 6.5] {
            id += 1;
            let mut enemy = unit(id, ENEMY, UnitType::Tank, x, y);
            if id <= 2 {
                enemy.durability = 10;
            }
            world.units.observe_new(enemy, 0);
        }
    }
    // Three healthy enemies worth +9 in cell (0, 3)
    for x in [1.0, 2.0, 3.0] {
        id += 1;
        world.units.observe_new(unit(id, ENEMY, UnitType::Ifv, x, 13.0), 0);
    }
    // Own fighters standing still in cell (0, 0)
    for x in [1.0, 2.0] {
        id += 1;
        world.units.observe_new(unit(id, ME, UnitType::Fighter, x, 1.0), 0);
    }

    let weights = ValueWeights::default();
    let grid = world.fragment_grid(ME, &weights, world.constants.grid);
    let best = grid.best_cell();
    assert_eq!(best, CellIndex::new(2, 1));
    assert_eq!(grid.cell(best).balance, 40);

    let mean = Vec2Fixed::from_f64(10.0, 5.5);
    let planner = AreaStrikePlanner::new(StrikeConfig::default(), weights);
    assert_eq!(planner.find_strike_target(&world, &me(0)), mean);

    // The delivery crew heads for the same point
    world.refresh_motion(ME, 200);
    let anchor = world.bottom_right(ME, UnitType::Fighter);
    let mut queue = CommandQueue::new();
    assert!(planner.try_send_delivery_crew(&world, &me(0), 200, anchor, &mut queue));
    let commands: Vec<Command> = queue.iter().copied().collect();
    assert_eq!(
        commands.last(),
        Some(&Command::MoveBy {
            offset: mean - anchor
        })
    );
}

#[test]
fn test_pending_move_blocks_strike() {
    let mut world = small_world();
    world.units.observe_new(unit(1, ME, UnitType::Fighter, 8.0, 8.0), 0);
    for i in 0..12 {
        let x = 8.0 + f64::from(i) * 0.1;
        world
            .units
            .observe_new(unit(100 + i64::from(i), ENEMY, UnitType::Tank, x, 8.5), 0);
    }
    let planner = AreaStrikePlanner::new(StrikeConfig::default(), ValueWeights::default());

    let pending = Command::MoveBy {
        offset: Vec2Fixed::from_f64(3.0, 0.0),
    };
    let mut queue = CommandQueue::new();
    queue.push_back(pending);
    assert!(planner.try_strike(&world, &me(0), 10, &mut queue).is_none());
    assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![pending]);

    // Same world with an empty queue fires
    let mut queue = CommandQueue::new();
    assert!(planner.try_strike(&world, &me(0), 10, &mut queue).is_some());
}

#[test]
fn test_dense_formation_turns_and_finishes_ground_regroup() {
    let scenario = Scenario::open_field(3);
    let constants = RuntimeConstants::new(&scenario.rules).expect("valid rules");
    let mut world = WorldState::new(constants, &EngineConfig::default());
    for u in &scenario.units {
        world.units.observe_new(*u, 0);
    }
    let strike = AreaStrikePlanner::new(StrikeConfig::default(), ValueWeights::default());
    let mut strategy = OpenFieldStrategy::new(OpenFieldConfig::default());

    let plan = |strategy: &mut OpenFieldStrategy, world: &mut WorldState, tick: Tick| {
        let input = tick_input(tick);
        world.refresh_motion(ME, tick);
        let mut queue = CommandQueue::new();
        let mut ctx = PlanContext {
            world,
            input: &input,
            strike: &strike,
            queue: &mut queue,
        };
        strategy.plan(&mut ctx);
        queue.iter().copied().collect::<Vec<Command>>()
    };

    // Deploy on the first tick
    assert!(!plan(&mut strategy, &mut world, 0).is_empty());

    // Walk the ground group up to the dense formation
    let still = MotionlessnessTracker::new(0);
    let mut machine = RegroupMachine::new();
    loop {
        machine.settle(&still);
        if machine.stage(UnitGroup::Ground) == RegroupStage::DenseFormation {
            break;
        }
        assert!(machine.complete_maneuver(UnitGroup::Ground).is_some());
    }
    *strategy.regroup_mut() = machine;

    let commands = plan(&mut strategy, &mut world, 200);
    assert!(commands.iter().any(|c| c.kind() == CommandKind::Rotate));
    for unit_type in UnitType::GROUND {
        assert_eq!(
            strategy.regroup().stage_of(unit_type),
            RegroupStage::ReadyForAttack
        );
    }
}

#[test]
fn test_commands_only_on_allowed_ticks() {
    let mut scenario = Scenario::open_field(3);
    scenario.rules.action_detection_interval = 60;
    scenario.rules.base_action_count = 2;

    let mut engine =
        DecisionEngine::new(&scenario.rules, EngineConfig::default()).expect("valid rules");
    let mut issued = Vec::new();
    for tick in 0..400 {
        let wire = engine.tick(&scenario.input(tick));
        if !wire.is_noop() {
            issued.push(tick);
        }
    }

    assert_eq!(issued.first(), Some(&0));
    assert!(issued.iter().all(|tick| tick % 30 == 0), "issued on {issued:?}");
    // The opening deployment alone keeps the queue busy for several slots
    assert!(issued.contains(&30) && issued.contains(&60));
}

#[test]
fn test_territory_game_captures_and_produces() {
    let scenario = Scenario::territory(3);
    let mut engine =
        DecisionEngine::new(&scenario.rules, EngineConfig::default()).expect("valid rules");
    let _ = engine.tick(&scenario.input(0));
    assert!(matches!(engine.strategy(), Some(ActiveStrategy::Territory(_))));

    // Hand a factory over to us and check production is requested on the
    // next action tick
    let mut input = scenario.input(5);
    input.facilities[0].owner = Some(ME);
    let _ = engine.tick(&input);
    assert!(engine
        .pending()
        .iter()
        .any(|c| matches!(c, Command::StartProduction { facility: 1, .. })));
}
