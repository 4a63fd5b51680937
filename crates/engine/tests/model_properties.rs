// Property-based tests for model transitions.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;

use csvdb_engine::column::pick_color;
use csvdb_engine::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Small name pool so collisions are frequent
fn arb_name() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => prop::sample::select(vec!["Name", "Status", "Tags", "Done", "Untitled", "Name 2"])
            .prop_map(str::to_string),
        1 => Just("".to_string()),
        1 => Just("   ".to_string()),
    ]
}

fn arb_kind() -> impl Strategy<Value = ColumnType> {
    prop::sample::select(ColumnType::ALL.to_vec())
}

fn arb_option() -> impl Strategy<Value = SelectOption> {
    (prop::sample::select(vec!["a", "b", "c", " ", "a "]), 0usize..9)
        .prop_map(|(v, c)| SelectOption::new(v, pick_color(c)))
}

fn arb_view(names: Vec<&'static str>) -> impl Strategy<Value = View> {
    let pick = prop::sample::select(names);
    (
        arb_name(),
        prop::collection::vec(pick.clone(), 0..3),
        prop::collection::vec(pick.clone(), 0..3),
        prop::collection::vec(pick, 0..3),
    )
        .prop_map(|(name, sorts, filters, hidden)| {
            let mut view = View::new(name);
            view.sorts = sorts
                .into_iter()
                .map(|c| SortRule { column: c.to_string(), direction: SortDirection::Desc })
                .collect();
            view.filters = filters
                .into_iter()
                .map(|c| FilterRule { column: c.to_string(), operator: FilterOperator::IsNotEmpty, value: vec![] })
                .collect();
            view.hidden_columns = hidden.into_iter().map(str::to_string).collect();
            view
        })
}

fn arb_action() -> impl Strategy<Value = Action> {
    let idx = 0usize..6;
    prop_oneof![
        2 => (idx.clone(), idx.clone(), "[a-c|]{0,5}").prop_map(|(row, col, value)| Action::SetCell { row, col, value }),
        2 => Just(Action::AddRow),
        1 => idx.clone().prop_map(|row| Action::DeleteRow { row }),
        3 => (arb_name(), arb_kind()).prop_map(|(n, k)| Action::AddColumn { column: Column::new(n, k) }),
        2 => idx.clone().prop_map(|col| Action::DeleteColumn { col }),
        2 => (idx.clone(), arb_name(), arb_kind(), prop::collection::vec(arb_option(), 0..4)).prop_map(
            |(col, name, kind, options)| Action::UpdateColumn {
                col,
                update: ColumnUpdate { name, kind, options, wrap_content: None },
            }
        ),
        1 => (idx.clone(), -10.0..400.0f64).prop_map(|(col, width)| Action::SetColumnWidth { col, width }),
        2 => (idx.clone(), idx.clone()).prop_map(|(a, b)| Action::ReorderColumn { a, b }),
        2 => (idx.clone(), prop::sample::select(vec!["a", "b", "c", ""])).prop_map(|(col, v)| {
            Action::AddSelectOption { col, value: v.to_string(), color: None }
        }),
        2 => (idx.clone(), prop::sample::select(vec!["a", "b", "c"]), prop::option::of(arb_option()))
            .prop_map(|(col, old, replacement)| Action::UpdateSelectOption {
                col,
                old_value: old.to_string(),
                replacement,
            }),
        1 => (idx.clone(), prop::sample::select(vec!["a", "b"]))
            .prop_map(|(col, v)| Action::RemoveOptionDefinition { col, value: v.to_string() }),
        1 => arb_name().prop_map(|name| Action::AddView { name }),
        1 => (0usize..3, arb_name()).prop_map(|(view, name)| Action::RenameView { view, name }),
        1 => (0usize..3).prop_map(|view| Action::DeleteView { view }),
        1 => (0usize..3, arb_view(vec!["Name", "Status", "Tags", "Gone"]))
            .prop_map(|(view, replacement)| Action::UpdateView { view, replacement }),
    ]
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    /// Every invariant holds after any sequence of transitions
    #[test]
    fn invariants_hold_after_any_sequence(actions in prop::collection::vec(arb_action(), 0..40)) {
        let mut model = DatabaseModel::new();
        for action in actions {
            model = model.apply(action);
            prop_assert!(model.check_invariants().is_ok(), "{:?}", model.check_invariants());
        }
    }

    /// Row width tracks column count through add/delete column sequences
    #[test]
    fn row_width_matches_columns(ops in prop::collection::vec((any::<bool>(), 0usize..5), 0..30), rows in 0usize..5) {
        let mut model = DatabaseModel::new();
        for _ in 0..rows {
            model.apply_mut(Action::AddRow);
        }
        for (add, col) in ops {
            if add {
                model.apply_mut(Action::AddColumn { column: Column::new("C", ColumnType::Text) });
            } else {
                model.apply_mut(Action::DeleteColumn { col });
            }
            prop_assert!(model.rows().iter().all(|r| r.len() == model.column_count()));
        }
    }

    /// Reordering the same pair twice is the identity
    #[test]
    fn reorder_twice_is_identity(n in 1usize..6, a in 0usize..6, b in 0usize..6) {
        let mut model = DatabaseModel::new();
        for _ in 0..n {
            model.apply_mut(Action::AddColumn { column: Column::new("C", ColumnType::Text) });
        }
        let once = model.apply(Action::ReorderColumn { a, b });
        let twice = once.apply(Action::ReorderColumn { a, b });
        prop_assert_eq!(twice, model);
    }

    /// Views built from arbitrary names never keep a reference to a missing column
    #[test]
    fn from_parts_prunes_dangling(views in prop::collection::vec(arb_view(vec!["Name", "Gone", "Other"]), 0..4)) {
        let model = DatabaseModel::from_parts(vec![Column::new("Name", ColumnType::Text)], vec![], views);
        prop_assert!(model.check_invariants().is_ok());
        prop_assert!(!model.views().is_empty());
    }

    /// Projection only ever reorders and drops rows
    #[test]
    fn projection_is_a_subset(cells in prop::collection::vec("[0-9a-z]{0,3}", 0..20), desc in any::<bool>()) {
        let mut view = View::new("v");
        view.sorts.push(SortRule {
            column: "N".into(),
            direction: if desc { SortDirection::Desc } else { SortDirection::Asc },
        });
        let rows = cells.iter().map(|c| vec![c.clone()]).collect();
        let model = DatabaseModel::from_parts(vec![Column::new("N", ColumnType::Number)], rows, vec![view]);

        let projection = project_view(&model, 0);
        let mut seen: Vec<usize> = projection.rows.iter().map(|r| r.original_index).collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..cells.len()).collect::<Vec<_>>());
        for row in &projection.rows {
            prop_assert_eq!(row.cells, model.rows()[row.original_index].as_slice());
        }
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn name_uniqueness_after_add_and_update() {
    let model = DatabaseModel::new()
        .apply(Action::AddColumn { column: Column::new("Name", ColumnType::Text) })
        .apply(Action::AddColumn { column: Column::new("Name", ColumnType::Text) })
        .apply(Action::AddColumn { column: Column::new("Name", ColumnType::Text) });
    let names: Vec<&str> = model.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Name", "Name 2", "Name 3"]);

    let update = ColumnUpdate::from_column(&model.columns()[2]).renamed("Name 2");
    let model = model.apply(Action::UpdateColumn { col: 2, update });
    assert_eq!(model.columns()[2].name, "Name 2 2");
}

#[test]
fn deleting_status_clears_every_view() {
    let mut model = DatabaseModel::new()
        .apply(Action::AddColumn { column: Column::new("Title", ColumnType::Text) })
        .apply(Action::AddColumn { column: Column::new("Status", ColumnType::Select) })
        .apply(Action::AddView { name: "Board".into() });

    for v in 0..model.views().len() {
        let view = model.views()[v]
            .with_hidden_toggled("Status")
            .with_sort_added(&model.display_columns())
            .with_sort_added(&model.display_columns());
        model = model.apply(Action::UpdateView { view: v, replacement: view });
    }
    assert!(model.views().iter().all(|v| v.references("Status")));

    let model = model.apply(Action::DeleteColumn { col: 1 });
    for view in model.views() {
        assert!(!view.references("Status"));
        assert!(view.references("Title"));
    }
}

#[test]
fn option_delete_modes_differ() {
    let model = DatabaseModel::new()
        .apply(Action::AddColumn { column: Column::new("Tags", ColumnType::MultiSelect) })
        .apply(Action::AddSelectOption { col: 0, value: "x".into(), color: None })
        .apply(Action::AddSelectOption { col: 0, value: "y".into(), color: None })
        .apply(Action::AddRow)
        .apply(Action::SetCell { row: 0, col: 0, value: "x|y".into() });

    let everywhere = model.apply(Action::delete_select_option(0, "x"));
    assert_eq!(everywhere.cell(0, 0), Some("y"));
    assert!(!everywhere.columns()[0].has_option("x"));

    let definition_only = model.apply(Action::RemoveOptionDefinition { col: 0, value: "x".into() });
    assert_eq!(definition_only.cell(0, 0), Some("x|y"));
    assert!(!definition_only.columns()[0].has_option("x"));
}

#[test]
fn options_get_palette_colors_in_order() {
    let mut model = DatabaseModel::new().apply(Action::AddColumn { column: Column::new("S", ColumnType::Select) });
    for v in ["a", "b", "c"] {
        model.apply_mut(Action::AddSelectOption { col: 0, value: v.into(), color: None });
    }
    let colors: Vec<TagColor> = model.columns()[0].options().iter().map(|o| o.color).collect();
    assert_eq!(colors, vec![TagColor::Gray, TagColor::Blue, TagColor::Green]);
}
